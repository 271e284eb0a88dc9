//! CreateGroupConversationHandler - Command handler for creating group
//! conversations.

use std::sync::Arc;

use crate::domain::foundation::{CommandMetadata, EventId, SerializableDomainEvent, UserId};
use crate::domain::messaging::{Conversation, ConversationCreated, MessagingError};
use crate::ports::{ConversationStore, EventPublisher, ProfileReader};

/// Command to create a group conversation.
#[derive(Debug, Clone)]
pub struct CreateGroupConversationCommand {
    pub creator_id: UserId,
    pub member_ids: Vec<UserId>,
    pub title: Option<String>,
}

/// Result of successful group creation.
#[derive(Debug, Clone)]
pub struct CreateGroupConversationResult {
    pub conversation: Conversation,
    pub event: ConversationCreated,
}

/// Handler for creating group conversations.
///
/// Groups are never deduplicated: every call creates a fresh conversation,
/// even for an identical member set.
pub struct CreateGroupConversationHandler {
    store: Arc<dyn ConversationStore>,
    profiles: Arc<dyn ProfileReader>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CreateGroupConversationHandler {
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
        cmd: CreateGroupConversationCommand,
        metadata: CommandMetadata,
    ) -> Result<CreateGroupConversationResult, MessagingError> {
        // 1. The creator must be the authenticated user
        if cmd.creator_id != metadata.user_id {
            return Err(MessagingError::unauthorized());
        }

        // 2. Build the conversation; membership is deduplicated and the
        //    creator is always included
        let conversation = Conversation::group(cmd.creator_id, cmd.member_ids, cmd.title)?;

        // 3. Every member must exist in the directory
        let participant_ids = conversation.participant_ids();
        let found: Vec<UserId> = self
            .profiles
            .get_many(&participant_ids)
            .await?
            .iter()
            .map(|p| p.user_id)
            .collect();
        if let Some(missing) = participant_ids.iter().find(|id| !found.contains(id)) {
            return Err(MessagingError::peer_not_found(*missing));
        }

        // 4. Persist; no uniqueness applies to groups
        self.store.insert_group(&conversation).await?;

        // 5. Publish only after the insert is durable
        let event = ConversationCreated {
            event_id: EventId::new(),
            conversation_id: *conversation.id(),
            created_by: *conversation.created_by(),
            is_group: true,
            title: conversation.title().map(str::to_string),
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

        Ok(CreateGroupConversationResult {
            conversation,
            event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::{Profile, UserRole};
    use crate::domain::foundation::{
        ConversationId, DomainError, ErrorCode, EventEnvelope, Timestamp,
    };
    use crate::domain::messaging::DirectKey;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockConversationStore {
        inserted: Mutex<Vec<Conversation>>,
        fail_insert: bool,
    }

    impl MockConversationStore {
        fn new() -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
                fail_insert: false,
            }
        }

        fn failing() -> Self {
            Self {
                inserted: Mutex::new(Vec::new()),
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
            _key: &DirectKey,
        ) -> Result<Option<ConversationId>, DomainError> {
            Ok(None)
        }

        async fn insert_direct(&self, conversation: &Conversation) -> Result<(), DomainError> {
            self.inserted.lock().unwrap().push(conversation.clone());
            Ok(())
        }

        async fn insert_group(&self, conversation: &Conversation) -> Result<(), DomainError> {
            if self.fail_insert {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    "Simulated insert failure",
                ));
            }
            self.inserted.lock().unwrap().push(conversation.clone());
            Ok(())
        }

        async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError> {
            Ok(self
                .inserted
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id() == id)
                .cloned())
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

    fn command(
        creator_id: UserId,
        member_ids: Vec<UserId>,
        title: Option<&str>,
    ) -> CreateGroupConversationCommand {
        CreateGroupConversationCommand {
            creator_id,
            member_ids,
            title: title.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn creates_group_including_creator() {
        let creator = UserId::new();
        let a = UserId::new();
        let b = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a, b]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store.clone(), profiles, publisher);
        let result = handler
            .handle(
                command(creator, vec![a, b], Some("Study group")),
                CommandMetadata::test_fixture(creator),
            )
            .await
            .unwrap();

        assert!(result.conversation.is_group());
        assert!(result.conversation.has_participant(&creator));
        assert!(result.conversation.has_participant(&a));
        assert!(result.conversation.has_participant(&b));
        assert_eq!(result.conversation.title(), Some("Study group"));
        assert_eq!(store.inserted().len(), 1);
    }

    #[tokio::test]
    async fn identical_member_sets_create_distinct_groups() {
        let creator = UserId::new();
        let a = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler =
            CreateGroupConversationHandler::new(store.clone(), profiles, publisher);

        let first = handler
            .handle(
                command(creator, vec![a], None),
                CommandMetadata::test_fixture(creator),
            )
            .await
            .unwrap();
        let second = handler
            .handle(
                command(creator, vec![a], None),
                CommandMetadata::test_fixture(creator),
            )
            .await
            .unwrap();

        assert_ne!(first.conversation.id(), second.conversation.id());
        assert_eq!(store.inserted().len(), 2);
    }

    #[tokio::test]
    async fn rejects_group_with_fewer_than_two_members() {
        let creator = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store.clone(), profiles, publisher);
        let result = handler
            .handle(
                // Duplicates of the creator collapse to a single member
                command(creator, vec![creator], None),
                CommandMetadata::test_fixture(creator),
            )
            .await;

        assert!(matches!(
            result,
            Err(MessagingError::ValidationFailed { .. })
        ));
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn rejects_creator_other_than_authenticated_user() {
        let creator = UserId::new();
        let a = UserId::new();
        let someone_else = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store, profiles, publisher);
        let result = handler
            .handle(
                command(creator, vec![a], None),
                CommandMetadata::test_fixture(someone_else),
            )
            .await;

        assert!(matches!(result, Err(MessagingError::Unauthorized)));
    }

    #[tokio::test]
    async fn rejects_unknown_member() {
        let creator = UserId::new();
        let known = UserId::new();
        let unknown = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, known]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store.clone(), profiles, publisher);
        let result = handler
            .handle(
                command(creator, vec![known, unknown], None),
                CommandMetadata::test_fixture(creator),
            )
            .await;

        assert!(matches!(result, Err(MessagingError::PeerNotFound(id)) if id == unknown));
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn blank_title_becomes_none() {
        let creator = UserId::new();
        let a = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store, profiles, publisher);
        let result = handler
            .handle(
                command(creator, vec![a], Some("   ")),
                CommandMetadata::test_fixture(creator),
            )
            .await
            .unwrap();

        assert_eq!(result.conversation.title(), None);
        assert_eq!(result.event.title, None);
    }

    #[tokio::test]
    async fn publishes_conversation_created_event() {
        let creator = UserId::new();
        let a = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store, profiles, publisher.clone());
        let result = handler
            .handle(
                command(creator, vec![a], Some("Lab partners")),
                CommandMetadata::test_fixture(creator),
            )
            .await
            .unwrap();

        let events = publisher.published_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "conversation.created.v1");

        let payload: ConversationCreated = events[0].payload_as().unwrap();
        assert!(payload.is_group);
        assert_eq!(payload.title, Some("Lab partners".to_string()));
        assert_eq!(payload.conversation_id, *result.conversation.id());
    }

    #[tokio::test]
    async fn succeeds_even_when_publish_fails() {
        let creator = UserId::new();
        let a = UserId::new();
        let store = Arc::new(MockConversationStore::new());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::failing());

        let handler = CreateGroupConversationHandler::new(store.clone(), profiles, publisher);
        let result = handler
            .handle(
                command(creator, vec![a], None),
                CommandMetadata::test_fixture(creator),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(store.inserted().len(), 1);
    }

    #[tokio::test]
    async fn propagates_insert_failure() {
        let creator = UserId::new();
        let a = UserId::new();
        let store = Arc::new(MockConversationStore::failing());
        let profiles = Arc::new(MockProfileReader::with_users(&[creator, a]));
        let publisher = Arc::new(MockEventPublisher::new());

        let handler = CreateGroupConversationHandler::new(store, profiles, publisher.clone());
        let result = handler
            .handle(
                command(creator, vec![a], None),
                CommandMetadata::test_fixture(creator),
            )
            .await;

        assert!(matches!(result, Err(MessagingError::Infrastructure(_))));
        assert!(publisher.published_events().is_empty());
    }
}
