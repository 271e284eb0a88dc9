//! Message log port - the durable, ordered record of every message.
//!
//! The log is the single source of truth for message history. Realtime
//! delivery is only a hint layered on top; any client view must be
//! reconstructible from `history` alone.
//!
//! # Ordering
//!
//! History is ordered by the composite key `(created_at, id)` ascending.
//! `append` assigns commit timestamps that are strictly increasing per
//! conversation, so append order and history order always agree.

use crate::domain::foundation::{ConversationId, DomainError, Timestamp};
use crate::domain::messaging::{Message, MessageDraft, MessageId};
use async_trait::async_trait;

/// Position in a conversation's history, for incremental fetches.
///
/// Identifies a message by its full sort key; `after` queries return
/// strictly later messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCursor {
    /// Commit time of the reference message.
    pub created_at: Timestamp,

    /// ID of the reference message.
    pub id: MessageId,
}

impl HistoryCursor {
    /// Creates a cursor pointing at the given message position.
    pub fn new(created_at: Timestamp, id: MessageId) -> Self {
        Self { created_at, id }
    }

    /// Creates a cursor for the position right after a committed message.
    pub fn after_message(message: &Message) -> Self {
        Self {
            created_at: *message.created_at(),
            id: *message.id(),
        }
    }
}

/// Options for reading conversation history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Maximum number of messages to return (`None` = unlimited).
    pub limit: Option<u32>,

    /// Return only messages strictly after this position.
    pub after: Option<HistoryCursor>,
}

impl HistoryOptions {
    /// Full history from the beginning, no limit.
    ///
    /// This is what client reconciliation uses after a gap or reconnect.
    pub fn all() -> Self {
        Self::default()
    }

    /// History strictly after the given position.
    pub fn after(cursor: HistoryCursor) -> Self {
        Self {
            limit: None,
            after: Some(cursor),
        }
    }

    /// Caps the result at `limit` messages.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Log port for durable message persistence.
///
/// # Contract
///
/// `append` must, in one atomic step:
/// - insert the message with a server-assigned commit timestamp
/// - advance the conversation's `last_message_at` to that timestamp
///
/// The assigned timestamp is strictly greater than every earlier commit
/// in the same conversation. Either both writes happen or neither does.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Durably commit a validated draft.
    ///
    /// Returns the committed message with its server-assigned ID and
    /// timestamp.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the target conversation doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn append(&self, draft: MessageDraft) -> Result<Message, DomainError>;

    /// Read ordered history for a conversation.
    ///
    /// Messages are ordered by `(created_at, id)` ascending.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on read failure
    async fn history(
        &self,
        conversation_id: &ConversationId,
        options: &HistoryOptions,
    ) -> Result<Vec<Message>, DomainError>;
}
