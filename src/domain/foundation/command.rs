//! Command infrastructure for CQRS handlers.
//!
//! This module provides the standard types for command handlers:
//! - `CommandMetadata` - Context that flows through command processing
//!
//! # DRY Pattern
//!
//! Instead of each handler accepting `correlation_id: Option<String>,
//! user_id: UserId, trace_id: Option<String>`, they accept a single
//! `CommandMetadata` struct. This:
//! - Reduces function parameter count
//! - Ensures consistent naming across all handlers
//! - Makes it easy to add new metadata fields without changing signatures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserId;

/// Metadata context for command handlers.
///
/// Carries tracing, correlation, and authentication context through the
/// command processing pipeline. `user_id` is the identity extracted from
/// the validated session token; handlers compare it against the identity
/// a command claims to act as.
///
/// # Example
///
/// ```ignore
/// pub struct SendMessageHandler {
///     log: Arc<dyn MessageLog>,
///     publisher: Arc<dyn EventPublisher>,
/// }
///
/// impl SendMessageHandler {
///     pub async fn handle(
///         &self,
///         cmd: SendMessageCommand,
///         metadata: CommandMetadata,
///     ) -> Result<SendMessageResult, MessagingError> {
///         // ... handler logic
///
///         // Propagate metadata to events
///         let envelope = EventEnvelope::from_event(&event)
///             .with_correlation_id(metadata.correlation_id())
///             .with_user_id(metadata.user_id.to_string());
///
///         self.publisher.publish(envelope).await?;
///         Ok(result)
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMetadata {
    /// The authenticated user executing this command.
    pub user_id: UserId,

    /// Links related operations across a single user request.
    /// Generated at the session boundary if not provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,

    /// Distributed tracing span/trace ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,

    /// Source of this command (e.g., "session", "test").
    /// Useful for audit logs and debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl CommandMetadata {
    /// Creates new command metadata with the authenticated user ID.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            correlation_id: None,
            trace_id: None,
            source: None,
        }
    }

    /// Builder: Add correlation ID for request tracing.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Builder: Add trace ID for distributed tracing.
    pub fn with_trace_id(mut self, id: impl Into<String>) -> Self {
        self.trace_id = Some(id.into());
        self
    }

    /// Builder: Add source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the correlation ID, generating one if not set.
    ///
    /// This ensures every command has a correlation ID for tracing,
    /// even if the caller didn't provide one.
    pub fn correlation_id(&self) -> String {
        self.correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Returns the correlation ID only if explicitly set.
    pub fn correlation_id_opt(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the trace ID if set.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Returns the source if set.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

#[cfg(test)]
impl CommandMetadata {
    /// Creates a test fixture for the given user.
    ///
    /// Only available in test builds.
    pub fn test_fixture(user_id: UserId) -> Self {
        Self::new(user_id)
            .with_correlation_id("test-correlation-id")
            .with_source("test")
    }
}
