//! SearchProfilesHandler - Query handler for finding users in the campus
//! directory.

use std::sync::Arc;

use crate::domain::directory::Profile;
use crate::domain::foundation::UserId;
use crate::domain::messaging::MessagingError;
use crate::ports::ProfileReader;

/// Default cap on directory search results.
const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Query to search the user directory by name or email.
#[derive(Debug, Clone)]
pub struct SearchProfilesQuery {
    pub requester_id: UserId,
    pub query: String,
    pub limit: u32,
}

impl SearchProfilesQuery {
    pub fn new(requester_id: UserId, query: impl Into<String>) -> Self {
        Self {
            requester_id,
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    /// Caps the result at `limit` profiles.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Handler for directory searches.
///
/// Matching is case-insensitive substring over display name and email.
/// The requester is excluded from results.
pub struct SearchProfilesHandler {
    profiles: Arc<dyn ProfileReader>,
}

impl SearchProfilesHandler {
    pub fn new(profiles: Arc<dyn ProfileReader>) -> Self {
        Self { profiles }
    }

    pub async fn handle(&self, query: SearchProfilesQuery) -> Result<Vec<Profile>, MessagingError> {
        let trimmed = query.query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let results = self.profiles.search(trimmed, query.limit).await?;
        Ok(results
            .into_iter()
            .filter(|p| p.user_id != query.requester_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::UserRole;
    use crate::domain::foundation::{DomainError, Timestamp};
    use async_trait::async_trait;

    struct MockProfileReader {
        profiles: Vec<Profile>,
    }

    impl MockProfileReader {
        fn with_profiles(profiles: Vec<Profile>) -> Self {
            Self { profiles }
        }
    }

    #[async_trait]
    impl ProfileReader for MockProfileReader {
        async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, DomainError> {
            Ok(self
                .profiles
                .iter()
                .find(|p| p.user_id == *user_id)
                .cloned())
        }

        async fn get_many(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, DomainError> {
            Ok(self
                .profiles
                .iter()
                .filter(|p| user_ids.contains(&p.user_id))
                .cloned()
                .collect())
        }

        async fn search(&self, query: &str, limit: u32) -> Result<Vec<Profile>, DomainError> {
            Ok(self
                .profiles
                .iter()
                .filter(|p| p.matches_query(query))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    fn profile(name: &str, email: &str) -> Profile {
        Profile::new(
            UserId::new(),
            Some(name.to_string()),
            Some(email.to_string()),
            None,
            UserRole::Student,
            Timestamp::now(),
        )
    }

    #[tokio::test]
    async fn finds_profiles_by_name_fragment() {
        let alice = profile("Alice Anderson", "alice@campus.edu");
        let bob = profile("Bob Brown", "bob@campus.edu");
        let reader = Arc::new(MockProfileReader::with_profiles(vec![
            alice.clone(),
            bob.clone(),
        ]));

        let handler = SearchProfilesHandler::new(reader);
        let results = handler
            .handle(SearchProfilesQuery::new(UserId::new(), "ali"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].user_id, alice.user_id);
    }

    #[tokio::test]
    async fn excludes_the_requester_from_results() {
        let me = profile("Casey Campus", "casey@campus.edu");
        let other = profile("Casey Other", "casey.other@campus.edu");
        let reader = Arc::new(MockProfileReader::with_profiles(vec![
            me.clone(),
            other.clone(),
        ]));

        let handler = SearchProfilesHandler::new(reader);
        let results = handler
            .handle(SearchProfilesQuery::new(me.user_id, "casey"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].user_id, other.user_id);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let reader = Arc::new(MockProfileReader::with_profiles(vec![profile(
            "Alice Anderson",
            "alice@campus.edu",
        )]));

        let handler = SearchProfilesHandler::new(reader);
        let results = handler
            .handle(SearchProfilesQuery::new(UserId::new(), "   "))
            .await
            .unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn respects_the_result_limit() {
        let profiles: Vec<Profile> = (0..5)
            .map(|i| profile(&format!("Student {}", i), &format!("s{}@campus.edu", i)))
            .collect();
        let reader = Arc::new(MockProfileReader::with_profiles(profiles));

        let handler = SearchProfilesHandler::new(reader);
        let results = handler
            .handle(SearchProfilesQuery::new(UserId::new(), "student").with_limit(3))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
    }
}
