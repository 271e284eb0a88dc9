//! Messaging command and query handlers.

mod create_group;
mod fetch_history;
mod list_conversations;
mod resolve_direct;
mod send_message;

pub use create_group::{
    CreateGroupConversationCommand, CreateGroupConversationHandler, CreateGroupConversationResult,
};
pub use fetch_history::{FetchHistoryHandler, FetchHistoryQuery};
pub use list_conversations::{ListConversationsHandler, ListConversationsQuery};
pub use resolve_direct::{
    ResolveDirectConversationCommand, ResolveDirectConversationHandler,
    ResolveDirectConversationResult,
};
pub use send_message::{SendMessageCommand, SendMessageHandler, SendMessageResult};
