//! ListConversationsHandler - Query handler for a user's conversation list.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::MessagingError;
use crate::ports::{ConversationReader, ConversationSummary};

/// Query to list a user's conversations.
#[derive(Debug, Clone)]
pub struct ListConversationsQuery {
    pub user_id: UserId,
}

impl ListConversationsQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Handler for listing conversations, newest activity first.
pub struct ListConversationsHandler {
    reader: Arc<dyn ConversationReader>,
}

impl ListConversationsHandler {
    pub fn new(reader: Arc<dyn ConversationReader>) -> Self {
        Self { reader }
    }

    pub async fn handle(
        &self,
        query: ListConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, MessagingError> {
        let summaries = self.reader.list_for_user(&query.user_id).await?;
        Ok(summaries)
    }
}
