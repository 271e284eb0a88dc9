//! Messaging domain module.
//!
//! Owns conversation identity, participant membership, and the immutable
//! message records. Direct conversations are deduplicated per unordered
//! user pair via `DirectKey`; group conversations are never deduplicated.
//!
//! # Events
//!
//! - `ConversationCreated` - Published when a conversation is persisted
//! - `MessageSent` - Published after a message is durably committed

mod conversation;
mod errors;
mod events;
mod message;

pub use conversation::{Conversation, DirectKey, Participant};
pub use errors::MessagingError;
pub use events::{ConversationCreated, MessageSent};
pub use message::{Message, MessageDraft, MessageId};
