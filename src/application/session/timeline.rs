//! Per-conversation message timeline kept by a client session.
//!
//! The timeline is an ordered, deduplicated view over two inputs that
//! arrive in no guaranteed order: durable history fetches and lossy
//! realtime hints. Inserting the same message twice, or replaying a full
//! history over live events, always converges on the same view, which is
//! what makes gap recovery a simple "refetch everything".
//!
//! Optimistic sends are tracked as pending entries alongside the
//! committed log until the server confirms them by `ClientRef`.

use std::collections::HashSet;

use chrono::Duration;

use crate::domain::foundation::{ClientRef, ConversationId, Timestamp, UserId};
use crate::domain::messaging::{Message, MessageId};

/// Delivery state of an optimistic send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// Dispatched, waiting for the server commit.
    InFlight,
    /// The send failed; kept visible so the user can retry.
    Failed,
}

/// An optimistically rendered message awaiting server confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    client_ref: ClientRef,
    sender_id: UserId,
    content: String,
    staged_at: Timestamp,
    state: PendingState,
}

impl PendingSend {
    pub fn client_ref(&self) -> ClientRef {
        self.client_ref
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn staged_at(&self) -> &Timestamp {
        &self.staged_at
    }

    pub fn is_failed(&self) -> bool {
        self.state == PendingState::Failed
    }
}

/// One renderable row of the timeline.
#[derive(Debug, Clone)]
pub enum TimelineEntry {
    /// A durably committed message, in log order.
    Committed(Message),
    /// An optimistic send not yet confirmed, after all committed rows.
    Pending(PendingSend),
}

/// Ordered, deduplicated view of one conversation.
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    conversation_id: ConversationId,
    committed: Vec<Message>,
    committed_ids: HashSet<MessageId>,
    pending: Vec<PendingSend>,
}

impl MessageTimeline {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            committed: Vec::new(),
            committed_ids: HashSet::new(),
            pending: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Committed messages in `(created_at, id)` order.
    pub fn messages(&self) -> &[Message] {
        &self.committed
    }

    /// The most recently committed message, if any.
    pub fn latest_message(&self) -> Option<&Message> {
        self.committed.last()
    }

    /// Full renderable view: committed rows in order, then pending sends
    /// in the order they were staged.
    pub fn entries(&self) -> Vec<TimelineEntry> {
        self.committed
            .iter()
            .cloned()
            .map(TimelineEntry::Committed)
            .chain(self.pending.iter().cloned().map(TimelineEntry::Pending))
            .collect()
    }

    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // ─────────────────────────────────────────────────────────────────
    // Committed log
    // ─────────────────────────────────────────────────────────────────

    /// Inserts a committed message at its sort position.
    ///
    /// Messages for other conversations and messages already present are
    /// ignored, so the same event may be applied any number of times.
    /// Returns true when the view actually changed.
    pub fn insert(&mut self, message: Message) -> bool {
        if message.conversation_id() != &self.conversation_id {
            return false;
        }
        if !self.committed_ids.insert(*message.id()) {
            return false;
        }
        match self
            .committed
            .binary_search_by(|m| m.sort_key().cmp(&message.sort_key()))
        {
            Ok(_) => false,
            Err(position) => {
                self.committed.insert(position, message);
                true
            }
        }
    }

    /// Replaces the committed log with a freshly fetched history.
    ///
    /// This is the gap-recovery path: realtime delivery is lossy, and the
    /// durable log is the source of truth, so a full refetch always wins.
    /// Pending sends are kept; they are confirmed or pruned separately.
    pub fn hydrate(&mut self, messages: Vec<Message>) {
        self.committed.clear();
        self.committed_ids.clear();
        for message in messages {
            self.insert(message);
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Optimistic sends
    // ─────────────────────────────────────────────────────────────────

    /// Stages an optimistic send awaiting server confirmation.
    ///
    /// A reference that is already staged is left untouched.
    pub fn stage(
        &mut self,
        client_ref: ClientRef,
        sender_id: UserId,
        content: impl Into<String>,
        staged_at: Timestamp,
    ) {
        if self.pending.iter().any(|p| p.client_ref == client_ref) {
            return;
        }
        self.pending.push(PendingSend {
            client_ref,
            sender_id,
            content: content.into(),
            staged_at,
            state: PendingState::InFlight,
        });
    }

    /// Confirms an optimistic send with its committed counterpart.
    ///
    /// Works whether the confirmation arrives via the send result or via
    /// the realtime event, in either order; the second application is a
    /// no-op. An unknown reference still inserts the message, which
    /// covers the user's own sends from another device.
    pub fn confirm(&mut self, client_ref: ClientRef, message: Message) -> bool {
        self.pending.retain(|p| p.client_ref != client_ref);
        self.insert(message)
    }

    /// Marks an in-flight send as failed. Returns false for unknown refs.
    pub fn mark_failed(&mut self, client_ref: ClientRef) -> bool {
        match self
            .pending
            .iter_mut()
            .find(|p| p.client_ref == client_ref)
        {
            Some(pending) => {
                pending.state = PendingState::Failed;
                true
            }
            None => false,
        }
    }

    /// Drops pending entries staged longer than `max_age` ago.
    ///
    /// A pending entry whose confirmation was lost would otherwise sit in
    /// the view forever next to its committed twin from a history fetch.
    pub fn prune_stale(&mut self, now: &Timestamp, max_age: Duration) {
        self.pending
            .retain(|p| now.duration_since(&p.staged_at) <= max_age);
    }
}
