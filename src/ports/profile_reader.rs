//! ProfileReader port for campus directory queries.
//!
//! The messaging core never writes profiles; it reads them to resolve
//! peers before starting conversations, to label direct conversations
//! with the other member's name, and to back people search.

use async_trait::async_trait;

use crate::domain::directory::Profile;
use crate::domain::foundation::{DomainError, UserId};

/// Query operations for user profiles.
#[async_trait]
pub trait ProfileReader: Send + Sync {
    /// Get a single profile.
    ///
    /// Returns `None` if the user has no profile (e.g. the account was
    /// deleted).
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError>;

    /// Get profiles for a set of users.
    ///
    /// Missing users are silently omitted; the result order is
    /// unspecified.
    async fn get_many(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, DomainError>;

    /// Search the directory by name or email.
    ///
    /// Matching is a case-insensitive substring test. Blank queries return
    /// an empty result.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Profile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait object safety test
    #[test]
    fn profile_reader_is_object_safe() {
        fn _accepts_dyn(_reader: &dyn ProfileReader) {}
    }
}
