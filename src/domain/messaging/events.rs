//! Messaging domain events.
//!
//! Events published after durable state changes:
//! - `ConversationCreated` - New direct or group conversation persisted
//! - `MessageSent` - Message committed to a conversation's log
//!
//! Both events carry the full participant list so fan-out can route them
//! without a storage lookup. Delivery over the realtime channel is a hint:
//! clients reconcile against the durable log, never against these events
//! alone.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, ClientRef, ConversationId, EventId, Timestamp, UserId,
};
use crate::domain::messaging::MessageId;

// ════════════════════════════════════════════════════════════════════════════
// ConversationCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a new conversation is persisted.
///
/// For direct conversations this fires only for the race winner; losers of
/// the creation race resolve to the winner's conversation and publish
/// nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCreated {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the created conversation.
    pub conversation_id: ConversationId,

    /// User who started the conversation.
    pub created_by: UserId,

    /// Whether this is a group conversation.
    pub is_group: bool,

    /// Group title, if any.
    pub title: Option<String>,

    /// All conversation members.
    pub participants: Vec<UserId>,

    /// When the conversation was created.
    pub created_at: Timestamp,
}

domain_event!(
    ConversationCreated,
    event_type = "conversation.created.v1",
    schema_version = 1,
    aggregate_id = conversation_id,
    aggregate_type = "Conversation",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// MessageSent
// ════════════════════════════════════════════════════════════════════════════

/// Published after a message is durably committed.
///
/// Publication happens strictly after the storage transaction succeeds, so
/// subscribers never observe a message that later fails to persist. The
/// optional `client_ref` lets the sender's own session match the event to
/// its optimistic pending entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSent {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// ID of the committed message.
    pub message_id: MessageId,

    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,

    /// Participant who sent the message.
    pub sender_id: UserId,

    /// The message content.
    pub content: String,

    /// All conversation members, including the sender.
    pub participants: Vec<UserId>,

    /// Client-generated reference for optimistic send matching.
    pub client_ref: Option<ClientRef>,

    /// Commit time assigned by the message log.
    pub created_at: Timestamp,
}

domain_event!(
    MessageSent,
    event_type = "message.sent.v1",
    schema_version = 1,
    aggregate_id = conversation_id,
    aggregate_type = "Conversation",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// Unit Tests
// ════════════════════════════════════════════════════════════════════════════
