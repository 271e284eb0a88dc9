//! ResolveDirectConversationHandler - Command handler that finds or creates
//! the single direct conversation for an unordered user pair.

use std::sync::Arc;

use crate::domain::foundation::{
    CommandMetadata, ConversationId, ErrorCode, EventId, SerializableDomainEvent, UserId,
};
use crate::domain::messaging::{Conversation, ConversationCreated, DirectKey, MessagingError};
use crate::ports::{ConversationStore, EventPublisher, ProfileReader};

/// Command to resolve the direct conversation between two users.
#[derive(Debug, Clone)]
pub struct ResolveDirectConversationCommand {
    pub caller_id: UserId,
    pub peer_id: UserId,
}

/// Result of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolveDirectConversationResult {
    pub conversation: Conversation,
    /// True when this call created the conversation, false when it found
    /// one that already existed (including losing a creation race).
    pub created: bool,
    pub event: Option<ConversationCreated>,
}

/// Handler for resolving direct conversations.
///
/// Resolution is racy by nature: two sessions can ask for the same pair at
/// the same time. The storage unique index on the pair key arbitrates, and
/// the loser refetches the winner's conversation, so callers always get the
/// same conversation and never see the underlying conflict.
pub struct ResolveDirectConversationHandler {
    store: Arc<dyn ConversationStore>,
    profiles: Arc<dyn ProfileReader>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ResolveDirectConversationHandler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        profiles: Arc<dyn ProfileReader>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            profiles,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ResolveDirectConversationCommand,
        metadata: CommandMetadata,
    ) -> Result<ResolveDirectConversationResult, MessagingError> {
        // 1. The caller must be the authenticated user
        if cmd.caller_id != metadata.user_id {
            return Err(MessagingError::unauthorized());
        }

        // 2. Reject self-conversations before touching storage
        if cmd.caller_id == cmd.peer_id {
            return Err(MessagingError::self_conversation());
        }

        // 3. The peer must exist in the directory
        if self.profiles.get(&cmd.peer_id).await?.is_none() {
            return Err(MessagingError::peer_not_found(cmd.peer_id));
        }

        // 4. Fast path: the pair already has a conversation
        let key = DirectKey::new(cmd.caller_id, cmd.peer_id)?;
        if let Some(existing) = self.store.find_direct(&key).await? {
            let conversation = self.fetch_resolved(&existing).await?;
            return Ok(ResolveDirectConversationResult {
                conversation,
                created: false,
                event: None,
            });
        }

        // 5. Insert; the unique index on the pair key arbitrates concurrent
        //    creation, surfacing Conflict to the loser
        let conversation = Conversation::direct(cmd.caller_id, cmd.peer_id)?;
        match self.store.insert_direct(&conversation).await {
            Ok(()) => {}
            Err(err) if err.code == ErrorCode::Conflict => {
                let winner = self.store.find_direct(&key).await?.ok_or_else(|| {
                    MessagingError::infrastructure(
                        "Direct conversation conflict without a visible winner",
                    )
                })?;
                let conversation = self.fetch_resolved(&winner).await?;
                return Ok(ResolveDirectConversationResult {
                    conversation,
                    created: false,
                    event: None,
                });
            }
            Err(err) => return Err(err.into()),
        }

        // 6. Publish only after the insert is durable. Delivery is a hint;
        //    a publish failure must not fail the already-committed creation.
        let event = ConversationCreated {
            event_id: EventId::new(),
            conversation_id: *conversation.id(),
            created_by: *conversation.created_by(),
            is_group: false,
            title: None,
            participants: conversation.participant_ids(),
            created_at: *conversation.created_at(),
        };

        let envelope = event
            .to_envelope()
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());

        if let Err(err) = self.event_publisher.publish(envelope).await {
            tracing::warn!(
                conversation_id = %conversation.id(),
                error = %err,
                "conversation.created publish failed; subscribers will catch up on resync"
            );
        }

        Ok(ResolveDirectConversationResult {
            conversation,
            created: true,
            event: Some(event),
        })
    }

    async fn fetch_resolved(&self, id: &ConversationId) -> Result<Conversation, MessagingError> {
        self.store.get(id).await?.ok_or_else(|| {
            MessagingError::infrastructure("Direct index points at a missing conversation")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::{Profile, UserRole};
    use crate::domain::foundation::{DomainError, EventEnvelope, Timestamp};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockConversationStore {
        inserted: Mutex<Vec<Conversation>>,
        existing: Mutex<Option<Conversation>>,
        conflict_winner: Option<Conversation>,
        fail_insert: bool,
    }

    impl MockConversationStore {
        fn new() -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                existing: Mutex::new(None),
                conflict_winner: None,
                fail_insert: false,
            }
        }

        fn with_existing(conversation: Conversation) -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                existing: Mutex::new(Some(conversation)),
                conflict_winner: None,
                fail_insert: false,
            }
        }

        /// Simulates losing the creation race: the insert reports a
        /// conflict and the winner's row becomes visible to reads.
        fn losing_race_to(winner: Conversation) -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                existing: Mutex::new(None),
                conflict_winner: Some(winner),
                fail_insert: false,
            }
        }

        fn failing() -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                existing: Mutex::new(None),
                conflict_winner: None,
                fail_insert: true,
            }
        }

        fn inserted(&self) -> Vec<Conversation> {
            self.inserted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConversationStore for MockConversationStore {
        async fn find_direct(
            &self,
            key: &DirectKey,
        ) -> Result<Option<ConversationId>, DomainError> {
            Ok(self
                .existing
                .lock()
                .unwrap()
                .as_ref()
                .filter(|c| c.direct_key() == Some(key))
                .map(|c| *c.id()))
        }

        async fn insert_direct(&self, conversation: &Conversation) -> Result<(), DomainError> {
            if self.fail_insert {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated insert failure",
                ));
            }
            if let Some(winner) = &self.conflict_winner {
                *self.existing.lock().unwrap() = Some(winner.clone());
                return Err(DomainError::new(
                    ErrorCode::Conflict,
                    "duplicate key value violates unique constraint",
                ));
            }
            self.inserted.lock().unwrap().push(conversation.clone());
            *self.existing.lock().unwrap() = Some(conversation.clone());
            Ok(())
        }

        async fn insert_group(&self, conversation: &Conversation) -> Result<(), DomainError> {
            self.inserted.lock().unwrap().push(conversation.clone());
            Ok(())
        }

        async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError> {
            Ok(self
                .existing
                .lock()
                .unwrap()
                .clone()
                .filter(|c| c.id() == id))
        }
    }

    struct MockProfileReader {
        profiles: Vec<Profile>,
    }

    impl MockProfileReader {
        fn with_users(ids: &[UserId]) -> Self {
            let profiles = ids
                .iter()
                .map(|id| {
                    Profile::new(
                        *id,
                        Some("Test User".to_string()),
                        Some("test@campus.edu".to_string()),
                        None,
                        UserRole::Student,
                        Timestamp::now(),
                    )
                })
                .collect();
            Self { profiles }
        }

        fn empty() -> Self {
            Self { profiles: vec![] }
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

        async fn search(&self, _query: &str, _limit: u32) -> Result<Vec<Profile>, DomainError> {
            Ok(vec![])
        }
    }

    struct MockEventPublisher {
        published_events: Mutex<Vec<EventEnvelope>>,
        fail_publish: bool,
    }

    impl MockEventPublisher {
        fn new() -> Self {
            Self {
                published_events: Mutex::new(Vec::new()),
                fail_publish: false,
            }
        }

        fn failing() -> Self {
            Self {
                published_events: Mutex::new(Vec::new()),
                fail_publish: true,
            }
        }

        fn published_events(&self) -> Vec<EventEnvelope> {
            self.published_events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for MockEventPublisher {
        async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
            if self.fail_publish {
                return Err(DomainError::new(
                    ErrorCode::InternalError,
                    "Simulated publish failure",
                ));
            }
            self.published_events.lock().unwrap().push(event);
            Ok(())
        }

        async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
            for event in events {
                self.publish(event).await?;
            }
            Ok(())
        }
    }

    fn handler_with(
        store: Arc<MockConversationStore>,
        profiles: Arc<MockProfileReader>,
        publisher: Arc<MockEventPublisher>,
    ) -> ResolveDirectConversationHandler {
        ResolveDirectConversationHandler::new(store, profiles, publisher)
    }

    fn command(caller_id: UserId, peer_id: UserId) -> ResolveDirectConversationCommand {
        ResolveDirectConversationCommand { caller_id, peer_id }
    }

    #[tokio::test]
    async fn creates_conversation_when_none_exists() {
        let caller = UserId::new();
        let peer = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store.clone(), profiles, publisher);
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await
            .unwrap();

        assert!(result.created);
        assert!(!result.conversation.is_group());
        assert!(result.conversation.has_participant(&caller));
        assert!(result.conversation.has_participant(&peer));
        assert_eq!(store.inserted().len(), 1);
    }

    #[tokio::test]
    async fn returns_existing_conversation_without_creating() {
        let caller = UserId::new();
        let peer = UserId::new();
        let existing = Conversation::direct(peer, caller).unwrap();
        let store = Arc::new(MockConversationStore::with_existing(existing.clone()));
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store.clone(), profiles, publisher.clone());
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await
            .unwrap();

        assert!(!result.created);
        assert_eq!(result.conversation.id(), existing.id());
        assert!(store.inserted().is_empty());
        assert!(publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn resolution_is_symmetric_in_caller_and_peer() {
        let alice = UserId::new();
        let bob = UserId::new();
        // Created with bob as initiator; alice resolving the same pair
        // must land on the same conversation.
        let existing = Conversation::direct(bob, alice).unwrap();
        let store = Arc::new(MockConversationStore::with_existing(existing.clone()));
        let profiles = Arc::new(MockProfileReader::with_users(&[alice, bob]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher);
        let result = handler
            .handle(command(alice, bob), CommandMetadata::test_fixture(alice))
            .await
            .unwrap();

        assert_eq!(result.conversation.id(), existing.id());
    }

    #[tokio::test]
    async fn losing_creation_race_returns_winner() {
        let caller = UserId::new();
        let peer = UserId::new();
        let winner = Conversation::direct(peer, caller).unwrap();
        let store = Arc::new(MockConversationStore::losing_race_to(winner.clone()));
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher.clone());
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await
            .unwrap();

        assert!(!result.created);
        assert_eq!(result.conversation.id(), winner.id());
        // The loser publishes nothing; only the winner's call announces
        // the conversation.
        assert!(publisher.published_events().is_empty());
    }

    #[tokio::test]
    async fn rejects_conversation_with_self() {
        let caller = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store.clone(), profiles, publisher);
        let result = handler
            .handle(
                command(caller, caller),
                CommandMetadata::test_fixture(caller),
            )
            .await;

        assert!(matches!(result, Err(MessagingError::SelfConversation)));
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn rejects_caller_other_than_authenticated_user() {
        let caller = UserId::new();
        let peer = UserId::new();
        let someone_else = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher);
        let result = handler
            .handle(
                command(caller, peer),
                CommandMetadata::test_fixture(someone_else),
            )
            .await;

        assert!(matches!(result, Err(MessagingError::Unauthorized)));
    }

    #[tokio::test]
    async fn rejects_unknown_peer() {
        let caller = UserId::new();
        let peer = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::empty());
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher);
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await;

        assert!(matches!(result, Err(MessagingError::PeerNotFound(id)) if id == peer));
    }

    #[tokio::test]
    async fn publishes_conversation_created_event() {
        let caller = UserId::new();
        let peer = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher.clone());
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await
            .unwrap();

        let events = publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "conversation.created.v1");
        assert_eq!(events[0].aggregate_id, result.conversation.id().to_string());
        assert_eq!(
            events[0].metadata.correlation_id,
            Some("test-correlation-id".to_string())
        );
    }

    #[tokio::test]
    async fn succeeds_even_when_publish_fails() {
        let caller = UserId::new();
        let peer = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::failing());

        let handler = handler_with(store.clone(), profiles, publisher);
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await;

        // The conversation is durable; the lost event is only a hint.
        assert!(result.is_ok());
        assert!(result.unwrap().created);
        assert_eq!(store.inserted().len(), 1);
    }

    #[tokio::test]
    async fn propagates_insert_failure() {
        let caller = UserId::new();
        let peer = UserId::new();
        let store = Arc::new(MockConversationStore::failing());
        let profiles = Arc::new(MockProfileReader::with_users(&[caller, peer]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = handler_with(store, profiles, publisher.clone());
        let result = handler
            .handle(command(caller, peer), CommandMetadata::test_fixture(caller))
            .await;

        assert!(matches!(result, Err(MessagingError::Infrastructure(_))));
        assert!(publisher.published_events().is_empty());
    }
}
