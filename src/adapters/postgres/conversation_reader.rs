//! PostgreSQL implementation of ConversationReader.
//!
//! Backs the conversation list with one query for the summaries and one
//! for the membership rows, instead of a query per conversation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use crate::ports::{ConversationReader, ConversationSummary, MessagePreview};

use super::storage_error;

/// PostgreSQL implementation of ConversationReader.
#[derive(Clone)]
pub struct PostgresConversationReader {
    pool: PgPool,
}

impl PostgresConversationReader {
    /// Creates a new PostgresConversationReader.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationReader for PostgresConversationReader {
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        // Each summary carries its latest message for the list preview.
        let summary_rows = sqlx::query(
            r#"
            SELECT c.id, c.created_by, c.is_group, c.title,
                   c.created_at, c.last_message_at,
                   last.sender_id AS preview_sender_id,
                   last.content AS preview_content,
                   last.created_at AS preview_created_at
            FROM conversations c
            JOIN conversation_participants me
              ON me.conversation_id = c.id AND me.user_id = $1
            LEFT JOIN LATERAL (
                SELECT sender_id, content, created_at
                FROM messages
                WHERE conversation_id = c.id
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            ) last ON TRUE
            ORDER BY c.last_message_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch conversation list", e))?;

        if summary_rows.is_empty() {
            return Ok(Vec::new());
        }

        let conversation_ids: Vec<uuid::Uuid> =
            summary_rows.iter().map(|row| row.get("id")).collect();

        // Membership for every listed conversation in one round trip.
        let member_rows = sqlx::query(
            r#"
            SELECT conversation_id, user_id
            FROM conversation_participants
            WHERE conversation_id = ANY($1)
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(&conversation_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("Failed to fetch participants", e))?;

        let mut members: HashMap<uuid::Uuid, Vec<UserId>> = HashMap::new();
        for row in &member_rows {
            let conversation_id: uuid::Uuid = row.get("conversation_id");
            let member_id: uuid::Uuid = row.get("user_id");
            members
                .entry(conversation_id)
                .or_default()
                .push(UserId::from_uuid(member_id));
        }

        let summaries = summary_rows
            .iter()
            .map(|row| {
                let id: uuid::Uuid = row.get("id");
                let created_by: uuid::Uuid = row.get("created_by");
                let is_group: bool = row.get("is_group");
                let title: Option<String> = row.get("title");
                let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
                let last_message_at: chrono::DateTime<chrono::Utc> = row.get("last_message_at");

                let preview_sender: Option<uuid::Uuid> = row.get("preview_sender_id");
                let preview_content: Option<String> = row.get("preview_content");
                let preview_created: Option<chrono::DateTime<chrono::Utc>> =
                    row.get("preview_created_at");

                let last_message = match (preview_sender, preview_content, preview_created) {
                    (Some(sender_id), Some(content), Some(created_at)) => Some(MessagePreview {
                        sender_id: UserId::from_uuid(sender_id),
                        content,
                        created_at: Timestamp::from_datetime(created_at),
                    }),
                    _ => None,
                };

                ConversationSummary {
                    conversation_id: ConversationId::from_uuid(id),
                    is_group,
                    title,
                    created_by: UserId::from_uuid(created_by),
                    participant_ids: members.remove(&id).unwrap_or_default(),
                    created_at: Timestamp::from_datetime(created_at),
                    last_message_at: Timestamp::from_datetime(last_message_at),
                    last_message,
                }
            })
            .collect();

        Ok(summaries)
    }
}
