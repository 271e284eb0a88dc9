//! Conversation reader port (read side / CQRS queries).
//!
//! Defines the contract for the conversation list view that backs the
//! client's sidebar: one summary per conversation the user participates
//! in, newest activity first.
//!
//! # Design
//!
//! - **Read-optimized**: Can use denormalized views and joins
//! - **Separated from write**: CQRS pattern, mirrors the store ports
//! - **Preview included**: The latest message rides along for display

use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reader port for conversation list queries.
#[async_trait]
pub trait ConversationReader: Send + Sync {
    /// List summaries of every conversation the user participates in.
    ///
    /// Ordered by `last_message_at` descending (most recent activity
    /// first).
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on read failure
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError>;
}

/// One row of the conversation list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Conversation ID.
    pub conversation_id: ConversationId,

    /// Whether this is a group conversation.
    pub is_group: bool,

    /// Stored group title (direct conversations have none; display names
    /// are resolved by the client session via the directory).
    pub title: Option<String>,

    /// User who started the conversation.
    pub created_by: UserId,

    /// All member user IDs.
    pub participant_ids: Vec<UserId>,

    /// When the conversation was created.
    pub created_at: Timestamp,

    /// Commit time of the most recent message (creation time if none).
    pub last_message_at: Timestamp,

    /// The latest message, for list preview.
    pub last_message: Option<MessagePreview>,
}

impl ConversationSummary {
    /// Returns the other member IDs from the given user's perspective.
    pub fn peers_of(&self, user_id: &UserId) -> Vec<UserId> {
        self.participant_ids
            .iter()
            .copied()
            .filter(|id| id != user_id)
            .collect()
    }
}

/// Preview of the most recent message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePreview {
    /// Who sent the latest message.
    pub sender_id: UserId,

    /// The message content.
    pub content: String,

    /// When the message was committed.
    pub created_at: Timestamp,
}
