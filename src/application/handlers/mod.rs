//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod directory;
pub mod messaging;

pub use directory::{SearchProfilesHandler, SearchProfilesQuery};
pub use messaging::{
    // Conversation resolution
    ResolveDirectConversationCommand,
    ResolveDirectConversationHandler,
    ResolveDirectConversationResult,
    // Group creation
    CreateGroupConversationCommand,
    CreateGroupConversationHandler,
    CreateGroupConversationResult,
    // Message dispatch
    SendMessageCommand,
    SendMessageHandler,
    SendMessageResult,
    // Read side
    FetchHistoryHandler,
    FetchHistoryQuery,
    ListConversationsHandler,
    ListConversationsQuery,
};
