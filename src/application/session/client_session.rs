//! Stateful client session over the stateless messaging handlers.
//!
//! The session owns what a connected client renders: the conversation
//! list ordered by recency, one `MessageTimeline` per opened
//! conversation, and the unread markers. It reconciles two inputs that
//! disagree about timing: durable reads through the query handlers and
//! lossy hints from the realtime channel. The durable log always wins;
//! realtime events only make the view converge sooner.
//!
//! # Connection lifecycle
//!
//! `run_realtime` drives the subscription loop. Every (re)subscribe is
//! followed by a full re-sync, because events published while the client
//! was away are gone; the channel replays nothing. A `Gap` item triggers
//! the same re-sync, a `Closed` item triggers a reconnect with backoff.
//!
//! # Optimistic sends
//!
//! `send` validates content first, stages a pending entry, then
//! dispatches. Confirmation may arrive through the command result or
//! through the session's own realtime echo; both paths converge on the
//! same committed row.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::{watch, Mutex};

use crate::application::handlers::{
    CreateGroupConversationCommand, CreateGroupConversationHandler, FetchHistoryHandler,
    FetchHistoryQuery, ListConversationsHandler, ListConversationsQuery,
    ResolveDirectConversationCommand, ResolveDirectConversationHandler, SearchProfilesHandler,
    SearchProfilesQuery, SendMessageCommand, SendMessageHandler,
};
use crate::domain::directory::Profile;
use crate::domain::foundation::{
    AuthError, ClientRef, CommandMetadata, ConversationId, Timestamp, UserId,
};
use crate::domain::messaging::{Message, MessageDraft, MessagingError};
use crate::ports::{
    ConversationSummary, MessagePreview, ProfileReader, RealtimeChannel, RealtimeEvent,
    SessionValidator, SubscriptionItem,
};

use super::retry::{retry_transient, RetryPolicy};
use super::timeline::MessageTimeline;

/// Label for a group conversation without a stored title.
const GROUP_TITLE_FALLBACK: &str = "Group conversation";

/// Label for a direct conversation whose peer has no profile.
const PEER_TITLE_FALLBACK: &str = "Unknown user";

/// How long an unconfirmed optimistic send stays visible.
const PENDING_RETENTION_MINUTES: i64 = 2;

/// Handlers and ports a session operates against.
///
/// Bundling them keeps the session constructor stable as the handler set
/// grows, and lets tests swap individual pieces.
#[derive(Clone)]
pub struct SessionBackend {
    pub resolve_direct: Arc<ResolveDirectConversationHandler>,
    pub create_group: Arc<CreateGroupConversationHandler>,
    pub send_message: Arc<SendMessageHandler>,
    pub fetch_history: Arc<FetchHistoryHandler>,
    pub list_conversations: Arc<ListConversationsHandler>,
    pub search_profiles: Arc<SearchProfilesHandler>,
    pub profiles: Arc<dyn ProfileReader>,
    pub realtime: Arc<dyn RealtimeChannel>,
}

/// One row of the conversation list, ready for rendering.
#[derive(Debug, Clone)]
pub struct ConversationView {
    /// The read-model summary this row is built from.
    pub summary: ConversationSummary,

    /// Resolved title: the stored group title or the peer's display name.
    pub display_title: String,

    /// True when the conversation holds activity the user has not opened.
    pub unread: bool,
}

/// Mutable view state, guarded by the session mutex.
#[derive(Default)]
struct SessionState {
    conversations: Vec<ConversationView>,
    timelines: HashMap<ConversationId, MessageTimeline>,
    unread: HashSet<ConversationId>,
    active_conversation: Option<ConversationId>,

    /// Latest fetch generation per conversation; older fetches that
    /// complete after a newer one started are discarded.
    fetch_marks: HashMap<ConversationId, u64>,
}

impl SessionState {
    fn timeline_mut(&mut self, conversation_id: ConversationId) -> &mut MessageTimeline {
        self.timelines
            .entry(conversation_id)
            .or_insert_with(|| MessageTimeline::new(conversation_id))
    }

    /// Folds a committed message into the cached conversation list.
    ///
    /// Returns false when the conversation is not listed yet, which means
    /// the list itself is stale and needs a refresh.
    fn touch_conversation(&mut self, message: &Message) -> bool {
        let Some(view) = self
            .conversations
            .iter_mut()
            .find(|v| v.summary.conversation_id == *message.conversation_id())
        else {
            return false;
        };

        if message.created_at().is_after(&view.summary.last_message_at) {
            view.summary.last_message_at = *message.created_at();
            view.summary.last_message = Some(MessagePreview {
                sender_id: *message.sender_id(),
                content: message.content().to_string(),
                created_at: *message.created_at(),
            });
        }

        self.conversations
            .sort_by(|a, b| b.summary.last_message_at.cmp(&a.summary.last_message_at));
        true
    }
}

/// A signed-in client's view of their conversations.
///
/// All methods take `&self`; state lives behind a mutex so the session
/// can be shared between the realtime loop and UI-facing calls.
pub struct ClientSession {
    user_id: UserId,
    backend: SessionBackend,
    retry: RetryPolicy,
    state: Mutex<SessionState>,
    fetch_generation: AtomicU64,
    shutdown: watch::Sender<bool>,
}

impl ClientSession {
    /// Creates a session for an already-authenticated user.
    pub fn new(user_id: UserId, backend: SessionBackend, retry: RetryPolicy) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            user_id,
            backend,
            retry,
            state: Mutex::new(SessionState::default()),
            fetch_generation: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Validates an access token and builds a session for its identity.
    ///
    /// Every command the session issues runs as this user; handlers
    /// reject commands that claim a different identity.
    pub async fn authenticate(
        token: &str,
        validator: &dyn SessionValidator,
        backend: SessionBackend,
        retry: RetryPolicy,
    ) -> Result<Self, AuthError> {
        let user = validator.validate(token).await?;
        tracing::debug!(user_id = %user.id, "Session authenticated");
        Ok(Self::new(user.id, backend, retry))
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Signals the realtime loop to stop.
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }

    // ─────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────

    /// Opens the direct conversation with `peer_id`, creating it if the
    /// pair has none yet, and loads its history.
    pub async fn open_direct(&self, peer_id: UserId) -> Result<ConversationId, MessagingError> {
        let command = ResolveDirectConversationCommand {
            caller_id: self.user_id,
            peer_id,
        };
        let metadata = CommandMetadata::new(self.user_id).with_source("client-session");
        let handler = self.backend.resolve_direct.clone();
        let result =
            retry_transient(&self.retry, || handler.handle(command.clone(), metadata.clone()))
                .await?;

        let conversation_id = *result.conversation.id();
        if let Err(err) = self.refresh_conversations().await {
            tracing::warn!(error = %err, "Conversation list refresh failed");
        }
        self.open_conversation(conversation_id).await?;
        Ok(conversation_id)
    }

    /// Creates a group conversation and opens it.
    pub async fn create_group(
        &self,
        member_ids: Vec<UserId>,
        title: Option<String>,
    ) -> Result<ConversationId, MessagingError> {
        let command = CreateGroupConversationCommand {
            creator_id: self.user_id,
            member_ids,
            title,
        };
        let metadata = CommandMetadata::new(self.user_id).with_source("client-session");
        let handler = self.backend.create_group.clone();
        let result =
            retry_transient(&self.retry, || handler.handle(command.clone(), metadata.clone()))
                .await?;

        let conversation_id = *result.conversation.id();
        if let Err(err) = self.refresh_conversations().await {
            tracing::warn!(error = %err, "Conversation list refresh failed");
        }
        self.open_conversation(conversation_id).await?;
        Ok(conversation_id)
    }

    /// Marks a conversation active, clears its unread flag, and re-syncs
    /// its history from the durable log.
    pub async fn open_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessagingError> {
        {
            let mut state = self.state.lock().await;
            state.active_conversation = Some(conversation_id);
            state.unread.remove(&conversation_id);
            state.timeline_mut(conversation_id);
        }
        self.resync_conversation(conversation_id).await
    }

    /// Sends a message, rendering it optimistically while it is in
    /// flight.
    ///
    /// Content is validated before anything is staged, so a blank send
    /// never appears in the timeline and never reaches storage. On
    /// failure the pending entry stays visible, flagged for retry.
    pub async fn send(
        &self,
        conversation_id: ConversationId,
        content: impl Into<String>,
    ) -> Result<Message, MessagingError> {
        let draft = MessageDraft::new(conversation_id, self.user_id, content)?;
        let client_ref = ClientRef::new();

        {
            let mut state = self.state.lock().await;
            state.timeline_mut(conversation_id).stage(
                client_ref,
                self.user_id,
                draft.content(),
                Timestamp::now(),
            );
        }

        let command = SendMessageCommand {
            conversation_id,
            sender_id: self.user_id,
            content: draft.content().to_string(),
            client_ref: Some(client_ref),
        };
        let metadata = CommandMetadata::new(self.user_id)
            .with_source("client-session")
            .with_correlation_id(client_ref.to_string());
        let handler = self.backend.send_message.clone();
        let outcome =
            retry_transient(&self.retry, || handler.handle(command.clone(), metadata.clone()))
                .await;

        let mut state = self.state.lock().await;
        match outcome {
            Ok(result) => {
                state
                    .timeline_mut(conversation_id)
                    .confirm(client_ref, result.message.clone());
                state.touch_conversation(&result.message);
                Ok(result.message)
            }
            Err(err) => {
                state.timeline_mut(conversation_id).mark_failed(client_ref);
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────

    /// The conversation list, most recently active first.
    pub async fn conversations(&self) -> Vec<ConversationView> {
        let state = self.state.lock().await;
        state
            .conversations
            .iter()
            .map(|view| {
                let mut view = view.clone();
                view.unread = state.unread.contains(&view.summary.conversation_id);
                view
            })
            .collect()
    }

    /// Snapshot of one conversation's timeline, if it has been opened or
    /// has received activity.
    pub async fn timeline(&self, conversation_id: &ConversationId) -> Option<MessageTimeline> {
        self.state.lock().await.timelines.get(conversation_id).cloned()
    }

    /// Searches the campus directory, excluding the session user.
    pub async fn search_users(&self, query: &str) -> Result<Vec<Profile>, MessagingError> {
        let search = SearchProfilesQuery::new(self.user_id, query);
        let handler = self.backend.search_profiles.clone();
        retry_transient(&self.retry, || handler.handle(search.clone())).await
    }

    // ─────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────

    /// Reloads the conversation list and resolves display titles.
    ///
    /// Unread flags survive the reload. A failed profile lookup degrades
    /// to fallback titles instead of failing the whole refresh.
    pub async fn refresh_conversations(&self) -> Result<(), MessagingError> {
        let query = ListConversationsQuery::for_user(self.user_id);
        let handler = self.backend.list_conversations.clone();
        let summaries = retry_transient(&self.retry, || handler.handle(query.clone())).await?;

        let peer_ids: Vec<UserId> = summaries
            .iter()
            .filter(|summary| !summary.is_group)
            .filter_map(|summary| summary.peers_of(&self.user_id).first().copied())
            .collect();
        let names: HashMap<UserId, String> =
            match self.backend.profiles.get_many(&peer_ids).await {
                Ok(profiles) => profiles
                    .into_iter()
                    .map(|profile| (profile.user_id, profile.display_name().to_string()))
                    .collect(),
                Err(err) => {
                    tracing::warn!(error = %err, "Peer profile lookup failed; using fallback titles");
                    HashMap::new()
                }
            };

        let mut state = self.state.lock().await;
        let views: Vec<ConversationView> = summaries
            .into_iter()
            .map(|summary| {
                let display_title = if summary.is_group {
                    summary
                        .title
                        .clone()
                        .unwrap_or_else(|| GROUP_TITLE_FALLBACK.to_string())
                } else {
                    summary
                        .peers_of(&self.user_id)
                        .first()
                        .and_then(|peer| names.get(peer))
                        .cloned()
                        .unwrap_or_else(|| PEER_TITLE_FALLBACK.to_string())
                };
                let unread = state.unread.contains(&summary.conversation_id);
                ConversationView {
                    summary,
                    display_title,
                    unread,
                }
            })
            .collect();
        state.conversations = views;
        Ok(())
    }

    /// Replaces a timeline with freshly fetched history.
    ///
    /// Fetches are generation-marked: when a newer fetch for the same
    /// conversation starts before this one lands, the stale result is
    /// dropped instead of clobbering the newer view.
    async fn resync_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<(), MessagingError> {
        let generation = self.fetch_generation.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut state = self.state.lock().await;
            state.fetch_marks.insert(conversation_id, generation);
        }

        let query = FetchHistoryQuery::full(conversation_id, self.user_id);
        let handler = self.backend.fetch_history.clone();
        let messages = retry_transient(&self.retry, || handler.handle(query.clone())).await?;

        let mut state = self.state.lock().await;
        if state.fetch_marks.get(&conversation_id) != Some(&generation) {
            return Ok(());
        }
        let timeline = state.timeline_mut(conversation_id);
        timeline.hydrate(messages);
        timeline.prune_stale(
            &Timestamp::now(),
            Duration::minutes(PENDING_RETENTION_MINUTES),
        );
        Ok(())
    }

    /// Re-syncs everything the session renders from the durable log.
    ///
    /// Runs after every (re)subscribe and after a delivery gap. Failures
    /// are logged, not propagated; the next gap or reconnect tries again.
    pub async fn resync_all(&self) {
        if let Err(err) = self.refresh_conversations().await {
            tracing::warn!(user_id = %self.user_id, error = %err, "Conversation list re-sync failed");
        }
        let tracked: Vec<ConversationId> = {
            let state = self.state.lock().await;
            state.timelines.keys().copied().collect()
        };
        let resyncs = tracked
            .into_iter()
            .map(|conversation_id| async move {
                if let Err(err) = self.resync_conversation(conversation_id).await {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        error = %err,
                        "History re-sync failed"
                    );
                }
            });
        futures::future::join_all(resyncs).await;
    }

    // ─────────────────────────────────────────────────────────────────
    // Realtime loop
    // ─────────────────────────────────────────────────────────────────

    /// Drives the realtime subscription until `close` is called.
    ///
    /// Spawn this on the runtime after building the session:
    ///
    /// ```ignore
    /// let session = Arc::new(ClientSession::new(user_id, backend, retry));
    /// tokio::spawn(session.clone().run_realtime());
    /// ```
    ///
    /// The loop re-subscribes with exponential backoff when the channel
    /// is unavailable or closes, and performs a full re-sync after every
    /// successful subscribe; events missed while disconnected are never
    /// replayed by the channel.
    pub async fn run_realtime(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut backoff = self.retry.initial_backoff();

        loop {
            if *shutdown.borrow() {
                return;
            }

            let mut subscription = match self.backend.realtime.subscribe(&self.user_id).await {
                Ok(subscription) => {
                    backoff = self.retry.initial_backoff();
                    subscription
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "Realtime subscribe failed; retrying"
                    );
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = self.retry.next_backoff(backoff);
                    continue;
                }
            };

            // Anything published while disconnected is gone from the
            // channel; start every subscription from the durable log.
            self.resync_all().await;

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            return;
                        }
                    }
                    item = subscription.next() => match item {
                        SubscriptionItem::Event(event) => {
                            self.apply_realtime_event(event).await;
                        }
                        SubscriptionItem::Gap { skipped } => {
                            tracing::info!(
                                user_id = %self.user_id,
                                skipped,
                                "Realtime delivery gap; re-syncing from the durable log"
                            );
                            self.resync_all().await;
                        }
                        SubscriptionItem::Closed => {
                            tracing::info!(user_id = %self.user_id, "Realtime channel closed; reconnecting");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Applies one delivered event to the session view.
    ///
    /// Events are hints over already-committed state, so every apply is
    /// idempotent; replays and out-of-order arrivals cannot corrupt the
    /// view.
    async fn apply_realtime_event(&self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::MessageReceived {
                message,
                client_ref,
            } => {
                let conversation_id = *message.conversation_id();
                let own = message.is_from(&self.user_id);
                let listed = {
                    let mut state = self.state.lock().await;
                    let inserted = match client_ref {
                        // The session's own echo confirms the pending entry
                        Some(reference) if own => {
                            state.timeline_mut(conversation_id).confirm(reference, message.clone())
                        }
                        _ => state.timeline_mut(conversation_id).insert(message.clone()),
                    };
                    if inserted && !own && state.active_conversation != Some(conversation_id) {
                        state.unread.insert(conversation_id);
                    }
                    if inserted {
                        state.touch_conversation(&message)
                    } else {
                        true
                    }
                };

                if !listed {
                    // A message for a conversation the list has never seen
                    if let Err(err) = self.refresh_conversations().await {
                        tracing::warn!(error = %err, "Conversation list refresh failed");
                    }
                }
            }
            RealtimeEvent::ConversationStarted {
                conversation_id,
                created_by,
                ..
            } => {
                {
                    let mut state = self.state.lock().await;
                    state.timeline_mut(conversation_id);
                    if created_by != self.user_id {
                        state.unread.insert(conversation_id);
                    }
                }
                if let Err(err) = self.refresh_conversations().await {
                    tracing::warn!(error = %err, "Conversation list refresh failed");
                }
            }
        }
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
