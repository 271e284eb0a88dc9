//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `auth` - Session token validation (hosted auth JWTs, mock for tests)
//! - `events` - In-process event bus
//! - `memory` - In-memory storage for tests and local development
//! - `postgres` - PostgreSQL-backed storage
//! - `realtime` - Per-user realtime channels and the bus-to-channel bridge

pub mod auth;
pub mod events;
pub mod memory;
pub mod postgres;
pub mod realtime;

pub use auth::{MockSessionValidator, SupabaseJwtConfig, SupabaseSessionValidator};
pub use events::InMemoryEventBus;
pub use memory::{InMemoryDirectory, InMemoryMessagingStore};
pub use postgres::{
    connect_pool, PostgresConversationReader, PostgresConversationStore, PostgresMessageLog,
    PostgresProfileReader,
};
pub use realtime::{RealtimeEventBridge, RealtimeHub, REALTIME_EVENT_TYPES};
