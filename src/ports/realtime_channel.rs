//! Realtime channel port - lossy fan-out of committed messaging events.
//!
//! The channel delivers at-most-once: events may be dropped when a
//! subscriber lags, and nothing is replayed on reconnect. Subscribers are
//! told when loss happened (`Gap`) or when the stream ended (`Closed`) and
//! are expected to re-sync from the durable message log. The channel is a
//! hint; it is never the source of truth.
//!
//! # Contract
//!
//! - Events arrive only after the underlying state change is durably
//!   committed
//! - A subscriber only receives events for conversations it participates in
//! - Dropping a `Subscription` unsubscribes; no explicit leave call exists

use async_trait::async_trait;

use crate::domain::foundation::{ClientRef, ConversationId, DomainError, Timestamp, UserId};
use crate::domain::messaging::Message;

/// A committed change pushed to connected clients.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    /// A message was committed to one of the subscriber's conversations.
    MessageReceived {
        /// The committed message.
        message: Message,

        /// Sender's optimistic-send reference, if any.
        client_ref: Option<ClientRef>,
    },

    /// A conversation including the subscriber was created.
    ConversationStarted {
        /// The new conversation.
        conversation_id: ConversationId,

        /// User who started it.
        created_by: UserId,

        /// Whether it is a group conversation.
        is_group: bool,

        /// Group title, if any.
        title: Option<String>,

        /// All member user IDs.
        participants: Vec<UserId>,

        /// When it was created.
        created_at: Timestamp,
    },
}

impl RealtimeEvent {
    /// Returns the conversation this event belongs to.
    pub fn conversation_id(&self) -> &ConversationId {
        match self {
            RealtimeEvent::MessageReceived { message, .. } => message.conversation_id(),
            RealtimeEvent::ConversationStarted {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

/// One item pulled from a subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionItem {
    /// A delivered event.
    Event(RealtimeEvent),

    /// The subscriber fell behind and `skipped` events were dropped.
    ///
    /// The durable log still has everything; the client must re-sync.
    Gap { skipped: u64 },

    /// The channel shut down; no further items will arrive.
    Closed,
}

/// Source of subscription items, implemented per channel adapter.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next item.
    ///
    /// After returning `Closed`, every subsequent call returns `Closed`.
    async fn next(&mut self) -> SubscriptionItem;
}

/// A live, per-user event subscription.
///
/// Dropping the subscription disconnects it.
pub struct Subscription {
    source: Box<dyn EventSource>,
}

impl Subscription {
    /// Wraps an adapter-provided event source.
    pub fn new(source: Box<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Waits for the next delivered item.
    pub async fn next(&mut self) -> SubscriptionItem {
        self.source.next().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Port for subscribing a user to their realtime event stream.
///
/// One subscription covers all of the user's conversations, including
/// conversations created after subscribing.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Open a subscription for the given user.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the channel cannot accept subscribers right now
    async fn subscribe(&self, user_id: &UserId) -> Result<Subscription, DomainError>;
}
