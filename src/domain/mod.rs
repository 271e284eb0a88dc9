//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `messaging` - Conversation and message aggregates with their events
//! - `directory` - User profile read models and display-name rules

pub mod directory;
pub mod foundation;
pub mod messaging;
