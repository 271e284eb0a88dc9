//! PostgreSQL adapters - Database implementations for the storage ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresConversationStore` - Conversation aggregates and direct-pair lookup
//! - `PostgresMessageLog` - Durable, ordered message history
//! - `PostgresConversationReader` - Read-optimized conversation list queries
//! - `PostgresProfileReader` - Campus directory lookups and search
//!
//! All adapters share one connection pool created by [`connect_pool`].

mod conversation_reader;
mod conversation_store;
mod message_log;
mod profile_reader;

pub use conversation_reader::PostgresConversationReader;
pub use conversation_store::PostgresConversationStore;
pub use message_log::PostgresMessageLog;
pub use profile_reader::PostgresProfileReader;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens a connection pool using the database configuration.
///
/// Runs pending migrations first when `run_migrations` is set.
///
/// # Errors
///
/// - `Unavailable` if the database cannot be reached
/// - `DatabaseError` if a migration fails to apply
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
        .map_err(|e| storage_error("Failed to connect to database", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to run migrations: {}", e),
            )
        })?;
    }

    Ok(pool)
}

/// Maps a sqlx error onto the domain taxonomy.
///
/// Connection-level failures surface as `Unavailable` so callers can retry
/// with backoff; everything else is a permanent `DatabaseError`.
pub(crate) fn storage_error(context: &str, e: sqlx::Error) -> DomainError {
    let code = match &e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            ErrorCode::Unavailable
        }
        _ => ErrorCode::DatabaseError,
    };

    DomainError::new(code, format!("{}: {}", context, e))
}
