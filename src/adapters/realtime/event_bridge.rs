//! Event bridge connecting domain events to connected clients.
//!
//! Subscribes to committed messaging events and fans them out to every
//! participant's realtime channel.
//!
//! # Event Flow
//!
//! ```text
//! Domain Event Published
//!          │
//!          ▼
//! ┌─────────────────────┐
//! │ RealtimeEventBridge │
//! │   receives event    │
//! └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────┐
//! │ Decode payload into │
//! │ a realtime event    │
//! └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────┐
//! │ Fan out to each     │
//! │ participant channel │
//! └─────────────────────┘
//! ```
//!
//! Events reach the bridge only after the underlying write committed, so
//! clients never see a message that later fails to persist. Delivery stays
//! best-effort past this point: a participant without an open channel
//! simply catches up from the durable log.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope, UserId};
use crate::domain::messaging::{ConversationCreated, Message, MessageSent};
use crate::ports::{EventHandler, EventSubscriber, RealtimeEvent};

use super::hub::RealtimeHub;

/// Event types that are routed to connected clients.
pub const REALTIME_EVENT_TYPES: &[&str] = &["conversation.created.v1", "message.sent.v1"];

/// Bridge between the event bus and per-user realtime channels.
///
/// Implements `EventHandler` to receive committed messaging events and
/// fan them out to every participant listed in the payload. Routing needs
/// no storage lookup; the events carry their full participant list.
pub struct RealtimeEventBridge {
    hub: Arc<RealtimeHub>,
}

impl RealtimeEventBridge {
    /// Create a new event bridge over the given hub.
    pub fn new(hub: Arc<RealtimeHub>) -> Self {
        Self { hub }
    }

    /// Create as an Arc (for sharing with an event subscriber).
    pub fn new_shared(hub: Arc<RealtimeHub>) -> Arc<Self> {
        Arc::new(Self::new(hub))
    }

    /// Register this bridge with an event subscriber.
    ///
    /// Subscribes to all client-relevant event types.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let bridge = RealtimeEventBridge::new_shared(hub);
    /// bridge.register(&event_bus);
    /// ```
    pub fn register(self: &Arc<Self>, subscriber: &impl EventSubscriber) {
        subscriber.subscribe_all(REALTIME_EVENT_TYPES, self.clone());
    }

    /// Decode an envelope into recipients and the event to deliver.
    ///
    /// Returns `Ok(None)` for event types that are not routed to clients.
    ///
    /// # Errors
    ///
    /// `InternalError` if a routed event type carries a payload that does
    /// not deserialize; that indicates a producer bug, not a routing
    /// concern.
    fn decode(
        &self,
        event: &EventEnvelope,
    ) -> Result<Option<(Vec<UserId>, RealtimeEvent)>, DomainError> {
        match event.event_type.as_str() {
            "message.sent.v1" => {
                let payload: MessageSent = event.payload_as().map_err(|e| {
                    DomainError::new(
                        ErrorCode::InternalError,
                        format!("Malformed message.sent.v1 payload: {}", e),
                    )
                })?;

                let message = Message::reconstitute(
                    payload.message_id,
                    payload.conversation_id,
                    payload.sender_id,
                    payload.content,
                    payload.created_at,
                );

                Ok(Some((
                    payload.participants,
                    RealtimeEvent::MessageReceived {
                        message,
                        client_ref: payload.client_ref,
                    },
                )))
            }
            "conversation.created.v1" => {
                let payload: ConversationCreated = event.payload_as().map_err(|e| {
                    DomainError::new(
                        ErrorCode::InternalError,
                        format!("Malformed conversation.created.v1 payload: {}", e),
                    )
                })?;

                Ok(Some((
                    payload.participants.clone(),
                    RealtimeEvent::ConversationStarted {
                        conversation_id: payload.conversation_id,
                        created_by: payload.created_by,
                        is_group: payload.is_group,
                        title: payload.title,
                        participants: payload.participants,
                        created_at: payload.created_at,
                    },
                )))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl EventHandler for RealtimeEventBridge {
    async fn handle(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let Some((recipients, realtime_event)) = self.decode(&event)? else {
            return Ok(()); // Event type not routed to clients
        };

        self.hub.fan_out(&recipients, realtime_event).await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "RealtimeEventBridge"
    }
}
