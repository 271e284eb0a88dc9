//! PostgreSQL implementation of MessageLog.
//!
//! The append path is a single statement, so the message insert and the
//! conversation's `last_message_at` advance commit or fail together. The
//! UPDATE half takes a row lock on the conversation, which serializes
//! concurrent appends and keeps commit timestamps strictly increasing per
//! conversation even when the wall clock stalls.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::messaging::{Message, MessageDraft, MessageId};
use crate::ports::{HistoryOptions, MessageLog};

use super::storage_error;

/// PostgreSQL implementation of MessageLog.
#[derive(Clone)]
pub struct PostgresMessageLog {
    pool: PgPool,
}

impl PostgresMessageLog {
    /// Creates a new PostgresMessageLog.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageLog for PostgresMessageLog {
    async fn append(&self, draft: MessageDraft) -> Result<Message, DomainError> {
        let message_id = MessageId::new();

        // The CTE advances the conversation clock and hands the new message
        // its commit timestamp in the same statement. A missing conversation
        // updates nothing, so no row comes back.
        let row = sqlx::query(
            r#"
            WITH bumped AS (
                UPDATE conversations
                SET last_message_at = GREATEST(
                        clock_timestamp(),
                        last_message_at + INTERVAL '1 microsecond'
                    ),
                    updated_at = clock_timestamp()
                WHERE id = $1
                RETURNING last_message_at
            )
            INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
            SELECT $2, $1, $3, $4, last_message_at
            FROM bumped
            RETURNING created_at
            "#,
        )
        .bind(draft.conversation_id().as_uuid())
        .bind(message_id.as_uuid())
        .bind(draft.sender_id().as_uuid())
        .bind(draft.content())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to append message", e))?;

        let row = match row {
            Some(row) => row,
            None => {
                return Err(DomainError::new(
                    ErrorCode::ConversationNotFound,
                    "Conversation not found",
                ))
            }
        };

        let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
        Ok(Message::from_draft(
            &draft,
            message_id,
            Timestamp::from_datetime(created_at),
        ))
    }

    async fn history(
        &self,
        conversation_id: &ConversationId,
        options: &HistoryOptions,
    ) -> Result<Vec<Message>, DomainError> {
        let rows = match (options.after, options.limit) {
            (None, None) => {
                sqlx::query(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = $1
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(conversation_id.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(limit)) => {
                sqlx::query(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = $1
                    ORDER BY created_at ASC, id ASC
                    LIMIT $2
                    "#,
                )
                .bind(conversation_id.as_uuid())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            (Some(cursor), None) => {
                sqlx::query(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = $1
                      AND (created_at, id) > ($2, $3)
                    ORDER BY created_at ASC, id ASC
                    "#,
                )
                .bind(conversation_id.as_uuid())
                .bind(cursor.created_at.as_datetime())
                .bind(cursor.id.as_uuid())
                .fetch_all(&self.pool)
                .await
            }
            (Some(cursor), Some(limit)) => {
                sqlx::query(
                    r#"
                    SELECT id, conversation_id, sender_id, content, created_at
                    FROM messages
                    WHERE conversation_id = $1
                      AND (created_at, id) > ($2, $3)
                    ORDER BY created_at ASC, id ASC
                    LIMIT $4
                    "#,
                )
                .bind(conversation_id.as_uuid())
                .bind(cursor.created_at.as_datetime())
                .bind(cursor.id.as_uuid())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| storage_error("Failed to fetch history", e))?;

        Ok(rows.iter().map(row_to_message).collect())
    }
}

// === Helper Functions ===

fn row_to_message(row: &sqlx::postgres::PgRow) -> Message {
    let id: uuid::Uuid = row.get("id");
    let conversation_id: uuid::Uuid = row.get("conversation_id");
    let sender_id: uuid::Uuid = row.get("sender_id");
    let content: String = row.get("content");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    Message::reconstitute(
        MessageId::from_uuid(id),
        ConversationId::from_uuid(conversation_id),
        UserId::from_uuid(sender_id),
        content,
        Timestamp::from_datetime(created_at),
    )
}
