//! PostgreSQL implementation of ProfileReader.
//!
//! Reads the shared `profiles` table maintained by the wider platform; the
//! messaging core never writes it.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::directory::{Profile, UserRole};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::ProfileReader;

use super::storage_error;

/// PostgreSQL implementation of ProfileReader.
#[derive(Clone)]
pub struct PostgresProfileReader {
    pool: PgPool,
}

impl PostgresProfileReader {
    /// Creates a new PostgresProfileReader.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileReader for PostgresProfileReader {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, full_name, email, avatar_url, role, created_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch profile", e))?;

        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_many(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, DomainError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<uuid::Uuid> = user_ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query(
            r#"
            SELECT user_id, full_name, email, avatar_url, role, created_at
            FROM profiles
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch profiles", e))?;

        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Profile>, DomainError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));

        let rows = sqlx::query(
            r#"
            SELECT user_id, full_name, email, avatar_url, role, created_at
            FROM profiles
            WHERE full_name ILIKE $1 OR email ILIKE $1
            ORDER BY full_name ASC, email ASC
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to search profiles", e))?;

        Ok(rows.iter().map(row_to_profile).collect())
    }
}

// === Helper Functions ===

fn row_to_profile(row: &sqlx::postgres::PgRow) -> Profile {
    let user_id: uuid::Uuid = row.get("user_id");
    let full_name: Option<String> = row.get("full_name");
    let email: Option<String> = row.get("email");
    let avatar_url: Option<String> = row.get("avatar_url");
    let role_str: &str = row.get("role");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    Profile::new(
        UserId::from_uuid(user_id),
        full_name,
        email,
        avatar_url,
        role_str.parse::<UserRole>().unwrap_or_default(), // Unknown roles read as students
        Timestamp::from_datetime(created_at),
    )
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
