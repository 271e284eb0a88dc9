//! Conversation store port (write side).
//!
//! Defines the contract for persisting conversations and resolving direct
//! conversations by their canonical pair key. Implementations back the
//! dedup guarantee: at most one direct conversation per unordered user
//! pair, enforced atomically at the storage layer.
//!
//! # Design
//!
//! - **Write-focused**: Optimized for aggregate persistence
//! - **Race-safe**: `insert_direct` must lose cleanly to a concurrent winner
//! - **No dedup for groups**: `insert_group` always creates a new row

use crate::domain::foundation::{ConversationId, DomainError};
use crate::domain::messaging::{Conversation, DirectKey};
use async_trait::async_trait;

/// Store port for Conversation aggregate persistence.
///
/// Implementations must enforce pair uniqueness for direct conversations
/// with a storage-level constraint (unique index or equivalent), not an
/// application-level check. Two concurrent `insert_direct` calls for the
/// same pair must resolve to exactly one stored conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up the direct conversation for a canonical pair.
    ///
    /// Returns `None` if the pair has no conversation yet.
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<ConversationId>, DomainError>;

    /// Persist a new direct conversation.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a conversation for the same pair already exists
    ///   (a concurrent caller won the creation race)
    /// - `DatabaseError` on persistence failure
    async fn insert_direct(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Persist a new group conversation.
    ///
    /// Group conversations are never deduplicated; every call stores a new
    /// conversation.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert_group(&self, conversation: &Conversation) -> Result<(), DomainError>;

    /// Load a conversation with its participants.
    ///
    /// Returns `None` if not found.
    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError>;
}
