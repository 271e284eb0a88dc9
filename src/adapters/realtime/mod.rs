//! Realtime fan-out adapters.
//!
//! - `RealtimeHub` - Per-user lossy broadcast channels
//! - `RealtimeEventBridge` - Routes committed domain events into the hub

mod event_bridge;
mod hub;

pub use event_bridge::{RealtimeEventBridge, REALTIME_EVENT_TYPES};
pub use hub::RealtimeHub;
