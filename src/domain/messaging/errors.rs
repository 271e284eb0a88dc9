//! Messaging-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, UserId, ValidationError};

/// Messaging-specific errors.
///
/// `Conflict` has no variant here on purpose: the unique-key race during
/// direct conversation creation is resolved inside the conversation
/// resolver by refetching the winner, so callers never observe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// A user tried to open a direct conversation with themselves.
    SelfConversation,
    /// The requested peer does not exist in the directory.
    PeerNotFound(UserId),
    /// Conversation was not found.
    ConversationNotFound,
    /// The command claims an identity other than the authenticated user.
    Unauthorized,
    /// User is not a participant of the conversation.
    Forbidden,
    /// Validation failed.
    ValidationFailed { field: String, message: String },
    /// Transient infrastructure failure, safe to retry with backoff.
    Unavailable(String),
    /// Infrastructure error.
    Infrastructure(String),
}

impl MessagingError {
    pub fn self_conversation() -> Self {
        MessagingError::SelfConversation
    }
    pub fn peer_not_found(id: UserId) -> Self {
        MessagingError::PeerNotFound(id)
    }
    pub fn conversation_not_found() -> Self {
        MessagingError::ConversationNotFound
    }
    pub fn unauthorized() -> Self {
        MessagingError::Unauthorized
    }
    pub fn forbidden() -> Self {
        MessagingError::Forbidden
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MessagingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn unavailable(message: impl Into<String>) -> Self {
        MessagingError::Unavailable(message.into())
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        MessagingError::Infrastructure(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            MessagingError::SelfConversation => ErrorCode::InvalidArgument,
            MessagingError::PeerNotFound(_) => ErrorCode::UserNotFound,
            MessagingError::ConversationNotFound => ErrorCode::ConversationNotFound,
            MessagingError::Unauthorized => ErrorCode::Unauthorized,
            MessagingError::Forbidden => ErrorCode::Forbidden,
            MessagingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MessagingError::Unavailable(_) => ErrorCode::Unavailable,
            MessagingError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
    pub fn message(&self) -> String {
        match self {
            MessagingError::SelfConversation => {
                "A direct conversation requires two distinct users".to_string()
            }
            MessagingError::PeerNotFound(id) => format!("User not found: {}", id),
            MessagingError::ConversationNotFound => "Conversation not found".to_string(),
            MessagingError::Unauthorized => {
                "Caller identity does not match the authenticated session".to_string()
            }
            MessagingError::Forbidden => "Permission denied".to_string(),
            MessagingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            MessagingError::Unavailable(msg) => format!("Service unavailable: {}", msg),
            MessagingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
    /// Returns true if the operation may succeed on retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, MessagingError::Unavailable(_))
    }
}

impl std::fmt::Display for MessagingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MessagingError {}

impl From<DomainError> for MessagingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConversationNotFound => MessagingError::ConversationNotFound,
            ErrorCode::Unauthorized => MessagingError::Unauthorized,
            ErrorCode::Forbidden => MessagingError::Forbidden,
            ErrorCode::ValidationFailed | ErrorCode::InvalidArgument => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                MessagingError::ValidationFailed {
                    field,
                    message: err.message,
                }
            }
            ErrorCode::Unavailable => MessagingError::Unavailable(err.message),
            _ => MessagingError::Infrastructure(err.to_string()),
        }
    }
}

impl From<ValidationError> for MessagingError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { field } => MessagingError::ValidationFailed {
                field,
                message: "cannot be empty".to_string(),
            },
            ValidationError::InvalidFormat { field, reason } => {
                MessagingError::ValidationFailed { field, message: reason }
            }
        }
    }
}
