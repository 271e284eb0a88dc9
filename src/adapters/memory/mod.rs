//! Process-local storage adapters.
//!
//! - `InMemoryMessagingStore` - Conversations, messages, and list views
//! - `InMemoryDirectory` - Campus profile directory

mod directory;
mod store;

pub use directory::InMemoryDirectory;
pub use store::InMemoryMessagingStore;
