//! In-memory messaging store.
//!
//! Implements the `ConversationStore`, `MessageLog`, and
//! `ConversationReader` ports over process-local state. One lock guards
//! all three views, so every operation the Postgres adapter performs in a
//! transaction happens atomically here too: direct-pair uniqueness,
//! message append plus `last_message_at` advance, and consistent list
//! reads.
//!
//! Used by unit and integration tests, and usable as a storage backend
//! for single-process demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::messaging::{Conversation, DirectKey, Message, MessageDraft, MessageId};
use crate::ports::{
    ConversationReader, ConversationStore, ConversationSummary, HistoryOptions, MessageLog,
    MessagePreview,
};

#[derive(Default)]
struct StoreState {
    conversations: HashMap<ConversationId, Conversation>,
    direct_index: HashMap<DirectKey, ConversationId>,
    messages: HashMap<ConversationId, Vec<Message>>,
}

/// Process-local implementation of the messaging storage ports.
///
/// # Consistency
///
/// A single async mutex serializes every operation. `append` reads the
/// conversation, assigns the next commit timestamp, stores the message,
/// and advances `last_message_at` without releasing the lock, matching
/// the atomicity the port contract demands.
pub struct InMemoryMessagingStore {
    state: Mutex<StoreState>,
}

impl InMemoryMessagingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    // === Test Helpers ===

    /// Returns the number of stored conversations.
    pub async fn conversation_count(&self) -> usize {
        self.state.lock().await.conversations.len()
    }

    /// Returns the number of stored messages in a conversation.
    pub async fn message_count(&self, conversation_id: &ConversationId) -> usize {
        self.state
            .lock()
            .await
            .messages
            .get(conversation_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryMessagingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryMessagingStore {
    async fn find_direct(&self, key: &DirectKey) -> Result<Option<ConversationId>, DomainError> {
        Ok(self.state.lock().await.direct_index.get(key).copied())
    }

    async fn insert_direct(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let key = *conversation.direct_key().ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                "Direct conversation is missing its pair key",
            )
        })?;

        let mut state = self.state.lock().await;

        if state.direct_index.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::Conflict,
                "A direct conversation for this pair already exists",
            ));
        }

        state.direct_index.insert(key, *conversation.id());
        state
            .conversations
            .insert(*conversation.id(), conversation.clone());

        Ok(())
    }

    async fn insert_group(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state
            .conversations
            .insert(*conversation.id(), conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &ConversationId) -> Result<Option<Conversation>, DomainError> {
        Ok(self.state.lock().await.conversations.get(id).cloned())
    }
}

#[async_trait]
impl MessageLog for InMemoryMessagingStore {
    async fn append(&self, draft: MessageDraft) -> Result<Message, DomainError> {
        let mut state = self.state.lock().await;

        let conversation = state
            .conversations
            .get_mut(draft.conversation_id())
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ConversationNotFound, "Conversation not found")
            })?;

        let committed_at = conversation.next_message_timestamp(Timestamp::now());
        let message = Message::from_draft(&draft, MessageId::new(), committed_at);
        conversation.record_message(committed_at);

        state
            .messages
            .entry(*message.conversation_id())
            .or_default()
            .push(message.clone());

        Ok(message)
    }

    async fn history(
        &self,
        conversation_id: &ConversationId,
        options: &HistoryOptions,
    ) -> Result<Vec<Message>, DomainError> {
        let state = self.state.lock().await;

        // Messages are stored in commit order; append timestamps are
        // strictly increasing per conversation
        let mut messages: Vec<Message> = state
            .messages
            .get(conversation_id)
            .map(|m| m.as_slice())
            .unwrap_or_default()
            .iter()
            .filter(|m| match &options.after {
                Some(cursor) => m.sort_key() > (cursor.created_at, cursor.id),
                None => true,
            })
            .cloned()
            .collect();

        if let Some(limit) = options.limit {
            messages.truncate(limit as usize);
        }

        Ok(messages)
    }
}

#[async_trait]
impl ConversationReader for InMemoryMessagingStore {
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let state = self.state.lock().await;

        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .map(|c| ConversationSummary {
                conversation_id: *c.id(),
                is_group: c.is_group(),
                title: c.title().map(String::from),
                created_by: *c.created_by(),
                participant_ids: c.participant_ids(),
                created_at: *c.created_at(),
                last_message_at: *c.last_message_at(),
                last_message: state.messages.get(c.id()).and_then(|messages| {
                    messages.last().map(|m| MessagePreview {
                        sender_id: *m.sender_id(),
                        content: m.content().to_string(),
                        created_at: *m.created_at(),
                    })
                }),
            })
            .collect();

        summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::HistoryCursor;

    fn draft(conversation: &Conversation, sender: &UserId, content: &str) -> MessageDraft {
        MessageDraft::new(*conversation.id(), *sender, content).unwrap()
    }

    mod conversation_store {
        use super::*;

        #[tokio::test]
        async fn insert_direct_then_find_direct_round_trips() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let bob = UserId::new();
            let conversation = Conversation::direct(alice, bob).unwrap();

            store.insert_direct(&conversation).await.unwrap();

            let key = DirectKey::new(bob, alice).unwrap();
            let found = store.find_direct(&key).await.unwrap();
            assert_eq!(found, Some(*conversation.id()));
        }

        #[tokio::test]
        async fn insert_direct_conflicts_on_same_pair() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let bob = UserId::new();

            store
                .insert_direct(&Conversation::direct(alice, bob).unwrap())
                .await
                .unwrap();

            // Same pair in swapped order still collides
            let err = store
                .insert_direct(&Conversation::direct(bob, alice).unwrap())
                .await
                .unwrap_err();

            assert_eq!(err.code, ErrorCode::Conflict);
            assert_eq!(store.conversation_count().await, 1);
        }

        #[tokio::test]
        async fn insert_group_never_conflicts() {
            let store = InMemoryMessagingStore::new();
            let creator = UserId::new();
            let members = vec![UserId::new(), UserId::new()];

            let first = Conversation::group(creator, members.clone(), None).unwrap();
            let second = Conversation::group(creator, members, None).unwrap();

            store.insert_group(&first).await.unwrap();
            store.insert_group(&second).await.unwrap();

            assert_eq!(store.conversation_count().await, 2);
        }

        #[tokio::test]
        async fn get_returns_stored_conversation() {
            let store = InMemoryMessagingStore::new();
            let conversation = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            let loaded = store.get(conversation.id()).await.unwrap();
            assert_eq!(loaded, Some(conversation));
        }

        #[tokio::test]
        async fn get_missing_returns_none() {
            let store = InMemoryMessagingStore::new();
            assert_eq!(store.get(&ConversationId::new()).await.unwrap(), None);
        }
    }

    mod message_log {
        use super::*;

        #[tokio::test]
        async fn append_assigns_strictly_increasing_timestamps() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let conversation = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            let first = store.append(draft(&conversation, &alice, "one")).await.unwrap();
            let second = store.append(draft(&conversation, &alice, "two")).await.unwrap();
            let third = store.append(draft(&conversation, &alice, "three")).await.unwrap();

            assert!(second.created_at().is_after(first.created_at()));
            assert!(third.created_at().is_after(second.created_at()));
        }

        #[tokio::test]
        async fn append_advances_last_message_at() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let conversation = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            let message = store.append(draft(&conversation, &alice, "hi")).await.unwrap();

            let stored = store.get(conversation.id()).await.unwrap().unwrap();
            assert_eq!(stored.last_message_at(), message.created_at());
        }

        #[tokio::test]
        async fn append_to_missing_conversation_fails() {
            let store = InMemoryMessagingStore::new();
            let orphan = MessageDraft::new(ConversationId::new(), UserId::new(), "hi").unwrap();

            let err = store.append(orphan).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ConversationNotFound);
        }

        #[tokio::test]
        async fn history_returns_commit_order() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let conversation = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            for content in ["one", "two", "three"] {
                store.append(draft(&conversation, &alice, content)).await.unwrap();
            }

            let history = store
                .history(conversation.id(), &HistoryOptions::all())
                .await
                .unwrap();

            let contents: Vec<&str> = history.iter().map(|m| m.content()).collect();
            assert_eq!(contents, vec!["one", "two", "three"]);
        }

        #[tokio::test]
        async fn history_after_cursor_returns_strictly_later() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let conversation = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            store.append(draft(&conversation, &alice, "one")).await.unwrap();
            let second = store.append(draft(&conversation, &alice, "two")).await.unwrap();
            store.append(draft(&conversation, &alice, "three")).await.unwrap();

            let options = HistoryOptions::after(HistoryCursor::after_message(&second));
            let history = store.history(conversation.id(), &options).await.unwrap();

            let contents: Vec<&str> = history.iter().map(|m| m.content()).collect();
            assert_eq!(contents, vec!["three"]);
        }

        #[tokio::test]
        async fn history_with_limit_truncates() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let conversation = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            for content in ["one", "two", "three"] {
                store.append(draft(&conversation, &alice, content)).await.unwrap();
            }

            let options = HistoryOptions::all().with_limit(2);
            let history = store.history(conversation.id(), &options).await.unwrap();

            assert_eq!(history.len(), 2);
            assert_eq!(history[0].content(), "one");
        }

        #[tokio::test]
        async fn history_of_unknown_conversation_is_empty() {
            let store = InMemoryMessagingStore::new();
            let history = store
                .history(&ConversationId::new(), &HistoryOptions::all())
                .await
                .unwrap();
            assert!(history.is_empty());
        }
    }

    mod conversation_reader {
        use super::*;

        #[tokio::test]
        async fn list_for_user_orders_by_recent_activity() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();

            let older = Conversation::direct(alice, UserId::new()).unwrap();
            let newer = Conversation::direct(alice, UserId::new()).unwrap();
            store.insert_direct(&older).await.unwrap();
            store.insert_direct(&newer).await.unwrap();

            // Activity in the older conversation moves it to the front
            store.append(draft(&newer, &alice, "first")).await.unwrap();
            store.append(draft(&older, &alice, "second")).await.unwrap();

            let list = store.list_for_user(&alice).await.unwrap();
            assert_eq!(list[0].conversation_id, *older.id());
            assert_eq!(list[1].conversation_id, *newer.id());
        }

        #[tokio::test]
        async fn list_for_user_includes_latest_preview() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();
            let bob = UserId::new();
            let conversation = Conversation::direct(alice, bob).unwrap();
            store.insert_direct(&conversation).await.unwrap();

            store.append(draft(&conversation, &alice, "hello")).await.unwrap();
            store.append(draft(&conversation, &bob, "hi back")).await.unwrap();

            let list = store.list_for_user(&alice).await.unwrap();
            let preview = list[0].last_message.as_ref().unwrap();
            assert_eq!(preview.content, "hi back");
            assert_eq!(preview.sender_id, bob);
        }

        #[tokio::test]
        async fn list_for_user_excludes_non_member_conversations() {
            let store = InMemoryMessagingStore::new();
            let alice = UserId::new();

            store
                .insert_direct(&Conversation::direct(alice, UserId::new()).unwrap())
                .await
                .unwrap();
            store
                .insert_direct(&Conversation::direct(UserId::new(), UserId::new()).unwrap())
                .await
                .unwrap();

            let list = store.list_for_user(&alice).await.unwrap();
            assert_eq!(list.len(), 1);
        }

        #[tokio::test]
        async fn list_carries_group_titles() {
            let store = InMemoryMessagingStore::new();
            let creator = UserId::new();
            let group = Conversation::group(
                creator,
                vec![UserId::new(), UserId::new()],
                Some("Algorithms tutoring".to_string()),
            )
            .unwrap();
            store.insert_group(&group).await.unwrap();

            let list = store.list_for_user(&creator).await.unwrap();
            assert!(list[0].is_group);
            assert_eq!(list[0].title.as_deref(), Some("Algorithms tutoring"));
            assert!(list[0].last_message.is_none());
        }
    }
}
