//! Per-user fan-out channels for committed messaging events.
//!
//! Channels are keyed by user ID: one channel carries every event the user
//! should see across all of their conversations. A user logged in on two
//! devices holds two subscriptions on the same channel and both receive
//! every event.
//!
//! # Architecture
//!
//! ```text
//! Channel: user-ana     Channel: user-bartosz
//! ├── laptop            └── phone
//! └── phone
//! ```
//!
//! Delivery is at-most-once. A subscriber that falls behind its channel
//! buffer loses the oldest events and is handed a `Gap` with the skip
//! count; recovery always goes through the durable message log, never
//! through the channel.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{EventSource, RealtimeChannel, RealtimeEvent, Subscription, SubscriptionItem};

/// Routes committed events to per-user broadcast channels.
///
/// Provides:
/// - Subscription per user, covering all of the user's conversations
/// - Fan-out of one event to many recipients
/// - Lazy cleanup of channels with no remaining subscribers
///
/// # Thread Safety
///
/// Uses `RwLock` for the channel registry since fan-outs (reads) vastly
/// outnumber subscribes (writes). This allows concurrent fan-out to
/// different users.
pub struct RealtimeHub {
    /// Map of user_id → broadcast sender for that user's event stream.
    channels: RwLock<HashMap<UserId, broadcast::Sender<RealtimeEvent>>>,

    /// Buffer capacity for each user's broadcast channel.
    channel_capacity: usize,
}

impl RealtimeHub {
    /// Create a new hub with the specified per-user channel capacity.
    ///
    /// # Arguments
    ///
    /// * `channel_capacity` - Buffer size for each user's channel. A
    ///   subscriber more than this many events behind sees a `Gap` and
    ///   must re-sync from the message log. Recommended: 100-256 for
    ///   typical conversation traffic.
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Create with default capacity (256 events).
    pub fn with_default_capacity() -> Self {
        Self::new(256)
    }

    /// Deliver an event to every recipient with an open channel.
    ///
    /// Recipients without a channel are skipped; the event is a hint and
    /// offline users catch up from the durable log. Channels whose last
    /// subscriber disconnected are removed on the way through.
    pub async fn fan_out(&self, recipients: &[UserId], event: RealtimeEvent) {
        let mut dead: Vec<UserId> = Vec::new();

        {
            let channels = self.channels.read().await;
            for user_id in recipients {
                if let Some(sender) = channels.get(user_id) {
                    if sender.receiver_count() == 0 {
                        dead.push(*user_id);
                    } else {
                        // Ignore send errors (receivers may race a disconnect)
                        let _ = sender.send(event.clone());
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut channels = self.channels.write().await;
            for user_id in dead {
                // Re-check under the write lock; a new subscriber may have
                // arrived between the two locks
                if let Some(sender) = channels.get(&user_id) {
                    if sender.receiver_count() == 0 {
                        channels.remove(&user_id);
                    }
                }
            }
        }
    }

    /// Drop a user's channel, closing every open subscription on it.
    ///
    /// Subscribers see `Closed` and are expected to reconnect.
    pub async fn disconnect(&self, user_id: &UserId) {
        self.channels.write().await.remove(user_id);
    }

    /// Number of open subscriptions for a user (0 if no channel exists).
    pub async fn subscriber_count(&self, user_id: &UserId) -> usize {
        self.channels
            .read()
            .await
            .get(user_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Users that currently hold a channel (for monitoring/debugging).
    pub async fn connected_users(&self) -> Vec<UserId> {
        self.channels.read().await.keys().copied().collect()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl RealtimeChannel for RealtimeHub {
    async fn subscribe(&self, user_id: &UserId) -> Result<Subscription, DomainError> {
        let mut channels = self.channels.write().await;

        // Get or create the user's channel
        let sender = channels.entry(*user_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        Ok(Subscription::new(Box::new(BroadcastSource {
            receiver: sender.subscribe(),
            closed: false,
        })))
    }
}

/// Adapts a broadcast receiver to the subscription item protocol.
struct BroadcastSource {
    receiver: broadcast::Receiver<RealtimeEvent>,
    closed: bool,
}

#[async_trait]
impl EventSource for BroadcastSource {
    async fn next(&mut self) -> SubscriptionItem {
        if self.closed {
            return SubscriptionItem::Closed;
        }

        match self.receiver.recv().await {
            Ok(event) => SubscriptionItem::Event(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                SubscriptionItem::Gap { skipped }
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.closed = true;
                SubscriptionItem::Closed
            }
        }
    }
}
