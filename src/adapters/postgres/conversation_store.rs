//! PostgreSQL implementation of ConversationStore.
//!
//! Persists Conversation aggregates and resolves direct conversations by
//! their canonical pair key. Pair uniqueness is enforced by a partial
//! unique index on `conversations.direct_key`, so two racing inserts for
//! the same pair commit exactly one row and the loser sees `Conflict`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::messaging::{Conversation, DirectKey, Participant};
use crate::ports::ConversationStore;

use super::storage_error;

/// PostgreSQL implementation of ConversationStore.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    /// Creates a new PostgresConversationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<ConversationId>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id
            FROM conversations
            WHERE direct_key = $1
            "#,
        )
        .bind(key.storage_key())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to look up direct conversation", e))?;

        Ok(row.map(|row| {
            let id: uuid::Uuid = row.get("id");
            ConversationId::from_uuid(id)
        }))
    }

    async fn insert_direct(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let direct_key = conversation.direct_key().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                "Direct conversation is missing its pair key",
            )
        })?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to start transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, created_by, is_group, title, direct_key,
                created_at, updated_at, last_message_at
            ) VALUES ($1, $2, FALSE, NULL, $3, $4, $5, $6)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.created_by().as_uuid())
        .bind(direct_key.storage_key())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .bind(conversation.last_message_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::new(
                    ErrorCode::Conflict,
                    "A direct conversation for this pair already exists",
                )
            } else {
                storage_error("Failed to insert conversation", e)
            }
        })?;

        insert_participants(&mut tx, conversation).await?;

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit transaction", e))?;

        Ok(())
    }

    async fn insert_group(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to start transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO conversations (
                id, created_by, is_group, title, direct_key,
                created_at, updated_at, last_message_at
            ) VALUES ($1, $2, TRUE, $3, NULL, $4, $5, $6)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(conversation.created_by().as_uuid())
        .bind(conversation.title())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .bind(conversation.last_message_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("Failed to insert conversation", e))?;

        insert_participants(&mut tx, conversation).await?;

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit transaction", e))?;

        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError> {
        let conv_row = sqlx::query(
            r#"
            SELECT id, created_by, is_group, title, direct_key,
                   created_at, updated_at, last_message_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch conversation", e))?;

        let conv_row = match conv_row {
            Some(row) => row,
            None => return Ok(None),
        };

        let participant_rows = sqlx::query(
            r#"
            SELECT user_id, joined_at
            FROM conversation_participants
            WHERE conversation_id = $1
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch participants", e))?;

        let participants: Vec<Participant> = participant_rows
            .iter()
            .map(|row| {
                let user_id: uuid::Uuid = row.get("user_id");
                let joined_at: chrono::DateTime<chrono::Utc> = row.get("joined_at");

                Participant::joined_at(
                    UserId::from_uuid(user_id),
                    Timestamp::from_datetime(joined_at),
                )
            })
            .collect();

        Ok(Some(row_to_conversation(&conv_row, participants)?))
    }
}

// === Helper Functions ===

async fn insert_participants(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation: &Conversation,
) -> Result<(), DomainError> {
    for participant in conversation.participants() {
        sqlx::query(
            r#"
            INSERT INTO conversation_participants (conversation_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(participant.user_id.as_uuid())
        .bind(participant.joined_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| storage_error("Failed to insert participant", e))?;
    }

    Ok(())
}

fn row_to_conversation(
    row: &sqlx::postgres::PgRow,
    participants: Vec<Participant>,
) -> Result<Conversation, DomainError> {
    let id: uuid::Uuid = row.get("id");
    let created_by: uuid::Uuid = row.get("created_by");
    let is_group: bool = row.get("is_group");
    let title: Option<String> = row.get("title");
    let direct_key: Option<String> = row.get("direct_key");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");
    let last_message_at: chrono::DateTime<chrono::Utc> = row.get("last_message_at");

    let direct_key = direct_key
        .as_deref()
        .map(DirectKey::from_storage)
        .transpose()
        .map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Stored direct key is malformed: {}", e),
            )
        })?;

    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        UserId::from_uuid(created_by),
        is_group,
        title,
        direct_key,
        participants,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
        Timestamp::from_datetime(last_message_at),
    ))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
