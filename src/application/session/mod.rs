//! Client session layer.
//!
//! A stateful, per-user view assembled on top of the stateless handlers:
//! ordered deduplicated timelines, the recency-ordered conversation list,
//! optimistic sends, and re-sync against the durable log whenever the
//! lossy realtime channel drops, lags, or reconnects.

mod client_session;
mod retry;
mod timeline;

pub use client_session::{ClientSession, ConversationView, SessionBackend};
pub use retry::{retry_transient, RetryPolicy};
pub use timeline::{MessageTimeline, PendingSend, PendingState, TimelineEntry};
