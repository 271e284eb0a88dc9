//! SendMessageHandler - Command handler for appending a message to a
//! conversation and announcing it to live subscribers.

use std::sync::Arc;

use crate::domain::foundation::{
    ClientRef, CommandMetadata, ConversationId, EventId, SerializableDomainEvent, UserId,
};
use crate::domain::messaging::{Message, MessageDraft, MessageSent, MessagingError};
use crate::ports::{ConversationStore, EventPublisher, MessageLog};

/// Command to send a message into a conversation.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    /// Client-generated reference echoed back in the `MessageSent` event so
    /// the sender's session can match it to its optimistic pending entry.
    pub client_ref: Option<ClientRef>,
}

/// Result of a successful send.
#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub message: Message,
    pub event: MessageSent,
}

/// Handler for sending messages.
///
/// Content is validated before any storage call, the append itself is
/// atomic with the conversation's activity bump, and the realtime
/// announcement goes out only once the append is durable.
pub struct SendMessageHandler {
    store: Arc<dyn ConversationStore>,
    log: Arc<dyn MessageLog>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SendMessageHandler {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        log: Arc<dyn MessageLog>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            log,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: SendMessageCommand,
        metadata: CommandMetadata,
    ) -> Result<SendMessageResult, MessagingError> {
        // 1. The sender must be the authenticated user
        if cmd.sender_id != metadata.user_id {
            return Err(MessagingError::unauthorized());
        }

        // 2. Trim and validate content before touching storage
        let draft = MessageDraft::new(cmd.conversation_id, cmd.sender_id, cmd.content)?;

        // 3. The sender must be a participant of an existing conversation
        let conversation = self
            .store
            .get(&cmd.conversation_id)
            .await?
            .ok_or_else(MessagingError::conversation_not_found)?;
        conversation.authorize_participant(&cmd.sender_id)?;

        // 4. Append; the log assigns the commit timestamp and advances the
        //    conversation's last activity in the same transaction
        let message = self.log.append(draft).await?;

        // 5. Publish only after the append is durable. Delivery is a hint;
        //    a publish failure must not fail the already-committed send.
        let event = MessageSent {
            event_id: EventId::new(),
            message_id: *message.id(),
            conversation_id: *message.conversation_id(),
            sender_id: *message.sender_id(),
            content: message.content().to_string(),
            participants: conversation.participant_ids(),
            client_ref: cmd.client_ref,
            created_at: *message.created_at(),
        };

        let envelope = event
            .to_envelope()
            .with_correlation_id(metadata.correlation_id())
            .with_user_id(metadata.user_id.to_string());

        if let Err(err) = self.event_publisher.publish(envelope).await {
            tracing::warn!(
                conversation_id = %message.conversation_id(),
                message_id = %message.id(),
                error = %err,
                "message.sent publish failed; subscribers will catch up on resync"
            );
        }

        Ok(SendMessageResult { message, event })
    }
}
