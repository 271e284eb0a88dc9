//! FetchHistoryHandler - Query handler for reading ordered conversation
//! history.

use std::sync::Arc;

use crate::domain::foundation::{ConversationId, UserId};
use crate::domain::messaging::{Message, MessagingError};
use crate::ports::{ConversationStore, HistoryCursor, HistoryOptions, MessageLog};

/// Query for a conversation's message history.
#[derive(Debug, Clone)]
pub struct FetchHistoryQuery {
    pub conversation_id: ConversationId,
    pub requester_id: UserId,
    pub options: HistoryOptions,
}

impl FetchHistoryQuery {
    /// Full history from the beginning.
    ///
    /// This is the reconciliation query: after a gap or reconnect the
    /// client replays the full log and rebuilds its view from it.
    pub fn full(conversation_id: ConversationId, requester_id: UserId) -> Self {
        Self {
            conversation_id,
            requester_id,
            options: HistoryOptions::all(),
        }
    }

    /// History strictly after a known position.
    pub fn after(
        conversation_id: ConversationId,
        requester_id: UserId,
        cursor: HistoryCursor,
    ) -> Self {
        Self {
            conversation_id,
            requester_id,
            options: HistoryOptions::after(cursor),
        }
    }
}

/// Handler for reading conversation history.
pub struct FetchHistoryHandler {
    store: Arc<dyn ConversationStore>,
    log: Arc<dyn MessageLog>,
}

impl FetchHistoryHandler {
    pub fn new(store: Arc<dyn ConversationStore>, log: Arc<dyn MessageLog>) -> Self {
        Self { store, log }
    }

    pub async fn handle(&self, query: FetchHistoryQuery) -> Result<Vec<Message>, MessagingError> {
        let conversation = self
            .store
            .get(&query.conversation_id)
            .await?
            .ok_or_else(MessagingError::conversation_not_found)?;
        conversation.authorize_participant(&query.requester_id)?;

        let messages = self
            .log
            .history(&query.conversation_id, &query.options)
            .await?;
        Ok(messages)
    }
}
