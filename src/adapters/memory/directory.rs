//! In-memory campus directory.
//!
//! Implements the `ProfileReader` port over a process-local profile map.
//! Profiles are owned by the wider platform; this adapter stands in for
//! the hosted directory in tests and single-process demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::directory::Profile;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::ProfileReader;

/// Process-local implementation of the campus directory.
pub struct InMemoryDirectory {
    profiles: RwLock<HashMap<UserId, Profile>>,
}

impl InMemoryDirectory {
    /// Creates a new empty directory.
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a directory seeded with the given profiles.
    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: RwLock::new(
                profiles.into_iter().map(|p| (p.user_id, p)).collect(),
            ),
        }
    }

    /// Registers a profile at runtime.
    pub async fn add_profile(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.user_id, profile);
    }

    /// Returns the number of registered profiles.
    pub async fn profile_count(&self) -> usize {
        self.profiles.read().await.len()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileReader for InMemoryDirectory {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn get_many(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, DomainError> {
        let profiles = self.profiles.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| profiles.get(id).cloned())
            .collect())
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Profile>, DomainError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let profiles = self.profiles.read().await;
        let mut matches: Vec<Profile> = profiles
            .values()
            .filter(|p| p.matches_query(query))
            .cloned()
            .collect();

        // Stable order for paging through results
        matches.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        matches.truncate(limit as usize);

        Ok(matches)
    }
}
