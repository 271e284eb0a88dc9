//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `ConversationStore` - Write side for conversations, race-safe direct dedup
//! - `MessageLog` - Durable, ordered message persistence (source of truth)
//! - `ConversationReader` - Read side for the conversation list view
//! - `ProfileReader` - Campus directory queries
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `EventSubscriber` - Port for subscribing to domain events
//! - `EventHandler` - Handler that processes incoming events
//! - `RealtimeChannel` - Lossy per-user fan-out to connected clients
//!
//! ## Auth Ports
//!
//! - `SessionValidator` - Access token validation

mod conversation_reader;
mod conversation_store;
mod event_publisher;
mod event_subscriber;
mod message_log;
mod profile_reader;
mod realtime_channel;
mod session_validator;

pub use conversation_reader::{ConversationReader, ConversationSummary, MessagePreview};
pub use conversation_store::ConversationStore;
pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventBus, EventHandler, EventSubscriber};
pub use message_log::{HistoryCursor, HistoryOptions, MessageLog};
pub use profile_reader::ProfileReader;
pub use realtime_channel::{
    EventSource, RealtimeChannel, RealtimeEvent, Subscription, SubscriptionItem,
};
pub use session_validator::SessionValidator;
