//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).
//! The `session` module layers the stateful client view on top of the
//! stateless handlers.

pub mod handlers;
pub mod session;

pub use handlers::{
    // Conversation handlers
    CreateGroupConversationCommand, CreateGroupConversationHandler,
    CreateGroupConversationResult, ResolveDirectConversationCommand,
    ResolveDirectConversationHandler, ResolveDirectConversationResult,
    // Message handlers
    FetchHistoryHandler, FetchHistoryQuery, SendMessageCommand, SendMessageHandler,
    SendMessageResult,
    // List and directory handlers
    ListConversationsHandler, ListConversationsQuery, SearchProfilesHandler, SearchProfilesQuery,
};
pub use session::{
    ClientSession, ConversationView, MessageTimeline, PendingSend, RetryPolicy, SessionBackend,
    TimelineEntry,
};
