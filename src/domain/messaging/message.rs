//! Message entity for conversations.
//!
//! Messages are immutable records of what a participant said in a
//! conversation. Ordering within a conversation follows the composite key
//! `(created_at, id)` ascending, which every reader and client view uses.

use crate::domain::foundation::{ConversationId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a message within a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a MessageId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A validated message awaiting durable append.
///
/// The draft trims surrounding whitespace and rejects blank content before
/// any I/O happens. The message log assigns the id and timestamp when the
/// draft is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    conversation_id: ConversationId,
    sender_id: UserId,
    content: String,
}

impl MessageDraft {
    /// Creates a draft from raw user input.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if content is empty after trimming
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let content = content.into().trim().to_string();
        if content.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }

        Ok(Self {
            conversation_id,
            sender_id,
            content,
        })
    }

    /// Returns the target conversation.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Returns the sender.
    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// Returns the trimmed content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// An immutable message within a conversation.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `content` is non-empty and carries no surrounding whitespace
/// - `created_at` is assigned by the message log and never changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message.
    id: MessageId,

    /// Conversation this message belongs to.
    conversation_id: ConversationId,

    /// Participant who sent the message.
    sender_id: UserId,

    /// The content of the message.
    content: String,

    /// When the message was committed to the log.
    created_at: Timestamp,
}

impl Message {
    /// Materializes a committed message from a draft.
    ///
    /// Called by message log implementations once the append timestamp is
    /// known. The draft has already validated the content.
    pub fn from_draft(draft: &MessageDraft, id: MessageId, created_at: Timestamp) -> Self {
        Self {
            id,
            conversation_id: draft.conversation_id,
            sender_id: draft.sender_id,
            content: draft.content.clone(),
            created_at,
        }
    }

    /// Reconstitutes a message from persistence (no validation).
    pub fn reconstitute(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: String,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            content,
            created_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the message ID.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns the conversation ID.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Returns the sender's user ID.
    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    /// Returns the content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the message was committed.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns the `(created_at, id)` sort key used for timeline ordering.
    pub fn sort_key(&self) -> (Timestamp, MessageId) {
        (self.created_at, self.id)
    }

    /// Returns true if the given user sent this message.
    pub fn is_from(&self, user_id: &UserId) -> bool {
        &self.sender_id == user_id
    }
}
