//! Conversation aggregate and direct-pair identity.
//!
//! Conversations come in two shapes: direct (exactly two participants,
//! deduplicated per unordered pair via `DirectKey`) and group (two or more
//! participants, never deduplicated). The aggregate owns participant
//! membership and the `last_message_at` high-water mark that orders the
//! conversation list.

use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, Timestamp, UserId, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Canonical identity of a direct conversation between two users.
///
/// The pair is unordered: `DirectKey::new(a, b)` and `DirectKey::new(b, a)`
/// produce the same key. The storage form `"{low}:{high}"` backs the unique
/// index that makes direct-conversation creation race-safe.
///
/// # Invariants
///
/// - `low < high` (UUID ordering), so a user never pairs with themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectKey {
    low: UserId,
    high: UserId,
}

impl DirectKey {
    /// Creates the canonical key for the unordered pair `(a, b)`.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if both sides are the same user
    pub fn new(a: UserId, b: UserId) -> Result<Self, ValidationError> {
        if a == b {
            return Err(ValidationError::invalid_format(
                "participants",
                "direct conversations require two distinct users",
            ));
        }

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    /// Parses a key from its storage form `"{low}:{high}"`.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if the string is malformed or the pair is not canonical
    pub fn from_storage(s: &str) -> Result<Self, ValidationError> {
        let parse = |part: &str| {
            part.parse::<UserId>().map_err(|_| {
                ValidationError::invalid_format("direct_key", "expected two UUIDs joined by ':'")
            })
        };

        let (low_str, high_str) = s.split_once(':').ok_or_else(|| {
            ValidationError::invalid_format("direct_key", "expected two UUIDs joined by ':'")
        })?;

        let low = parse(low_str)?;
        let high = parse(high_str)?;
        if low >= high {
            return Err(ValidationError::invalid_format(
                "direct_key",
                "pair is not in canonical order",
            ));
        }

        Ok(Self { low, high })
    }

    /// Returns the smaller user ID of the pair.
    pub fn low(&self) -> &UserId {
        &self.low
    }

    /// Returns the larger user ID of the pair.
    pub fn high(&self) -> &UserId {
        &self.high
    }

    /// Returns the storage form used by the unique index.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.low, self.high)
    }
}

impl std::fmt::Display for DirectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}

/// Membership record tying a user to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The member's user ID.
    pub user_id: UserId,

    /// When the user joined the conversation.
    pub joined_at: Timestamp,
}

impl Participant {
    /// Creates a participant joining now.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            joined_at: Timestamp::now(),
        }
    }

    /// Creates a participant with an explicit join time.
    pub fn joined_at(user_id: UserId, joined_at: Timestamp) -> Self {
        Self { user_id, joined_at }
    }
}

/// Conversation aggregate - a thread of messages between participants.
///
/// # Invariants
///
/// - Direct conversations have exactly two participants and a `DirectKey`
/// - Group conversations have at least two participants and no `DirectKey`
/// - `title` is only carried by group conversations
/// - `last_message_at` never moves backwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier for this conversation.
    id: ConversationId,

    /// User who started the conversation.
    created_by: UserId,

    /// Whether this is a group conversation.
    is_group: bool,

    /// Optional group title (always `None` for direct conversations).
    title: Option<String>,

    /// Canonical pair identity for direct conversations.
    direct_key: Option<DirectKey>,

    /// Conversation members.
    participants: Vec<Participant>,

    /// When the conversation was created.
    created_at: Timestamp,

    /// When the conversation was last modified.
    updated_at: Timestamp,

    /// Commit time of the most recent message (creation time if none).
    last_message_at: Timestamp,
}

impl Conversation {
    /// Creates a new direct conversation between the initiator and a peer.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if initiator and peer are the same user
    pub fn direct(initiator: UserId, peer: UserId) -> Result<Self, DomainError> {
        let key = DirectKey::new(initiator, peer)?;

        let now = Timestamp::now();
        Ok(Self {
            id: ConversationId::new(),
            created_by: initiator,
            is_group: false,
            title: None,
            direct_key: Some(key),
            participants: vec![
                Participant::joined_at(initiator, now),
                Participant::joined_at(peer, now),
            ],
            created_at: now,
            updated_at: now,
            last_message_at: now,
        })
    }

    /// Creates a new group conversation.
    ///
    /// The creator is always a member; duplicate member IDs collapse to one.
    /// A blank title is treated as absent.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the final member set has fewer than two users
    pub fn group(
        created_by: UserId,
        members: Vec<UserId>,
        title: Option<String>,
    ) -> Result<Self, DomainError> {
        let mut member_ids = vec![created_by];
        for id in members {
            if !member_ids.contains(&id) {
                member_ids.push(id);
            }
        }

        if member_ids.len() < 2 {
            return Err(DomainError::validation(
                "members",
                "Group conversations need at least two members",
            ));
        }

        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let now = Timestamp::now();
        Ok(Self {
            id: ConversationId::new(),
            created_by,
            is_group: true,
            title,
            direct_key: None,
            participants: member_ids
                .into_iter()
                .map(|id| Participant::joined_at(id, now))
                .collect(),
            created_at: now,
            updated_at: now,
            last_message_at: now,
        })
    }

    /// Reconstitutes a conversation from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ConversationId,
        created_by: UserId,
        is_group: bool,
        title: Option<String>,
        direct_key: Option<DirectKey>,
        participants: Vec<Participant>,
        created_at: Timestamp,
        updated_at: Timestamp,
        last_message_at: Timestamp,
    ) -> Self {
        Self {
            id,
            created_by,
            is_group,
            title,
            direct_key,
            participants,
            created_at,
            updated_at,
            last_message_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the conversation ID.
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Returns the user who started the conversation.
    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    /// Returns true for group conversations.
    pub fn is_group(&self) -> bool {
        self.is_group
    }

    /// Returns the group title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the canonical pair identity for direct conversations.
    pub fn direct_key(&self) -> Option<&DirectKey> {
        self.direct_key.as_ref()
    }

    /// Returns the conversation members.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Returns the member user IDs.
    pub fn participant_ids(&self) -> Vec<UserId> {
        self.participants.iter().map(|p| p.user_id).collect()
    }

    /// Returns when the conversation was created.
    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    /// Returns when the conversation was last modified.
    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Returns the commit time of the most recent message.
    pub fn last_message_at(&self) -> &Timestamp {
        &self.last_message_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization
    // ─────────────────────────────────────────────────────────────────────────

    /// Checks if the given user is a member of this conversation.
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.user_id == user_id)
    }

    /// Validates that the user may read or post in this conversation.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the user is not a member
    pub fn authorize_participant(&self, user_id: &UserId) -> Result<(), DomainError> {
        if self.has_participant(user_id) {
            Ok(())
        } else {
            Err(DomainError::new(
                ErrorCode::Forbidden,
                "User is not a participant in this conversation",
            ))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Computes the commit timestamp for the next message.
    ///
    /// Message times are strictly increasing per conversation: when the wall
    /// clock has not moved past `last_message_at`, the previous time is bumped
    /// by one microsecond instead.
    pub fn next_message_timestamp(&self, now: Timestamp) -> Timestamp {
        if now.is_after(&self.last_message_at) {
            now
        } else {
            self.last_message_at.plus_micros(1)
        }
    }

    /// Records a committed message, advancing `last_message_at`.
    pub fn record_message(&mut self, committed_at: Timestamp) {
        self.last_message_at = self.last_message_at.max(committed_at);
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod direct_key {
        use super::*;

        #[test]
        fn is_symmetric_in_argument_order() {
            let a = UserId::new();
            let b = UserId::new();

            let key_ab = DirectKey::new(a, b).unwrap();
            let key_ba = DirectKey::new(b, a).unwrap();

            assert_eq!(key_ab, key_ba);
            assert_eq!(key_ab.storage_key(), key_ba.storage_key());
        }

        #[test]
        fn orders_pair_canonically() {
            let a = UserId::new();
            let b = UserId::new();

            let key = DirectKey::new(a, b).unwrap();
            assert!(key.low() < key.high());
        }

        #[test]
        fn rejects_same_user_on_both_sides() {
            let a = UserId::new();
            assert!(DirectKey::new(a, a).is_err());
        }

        #[test]
        fn storage_form_round_trips() {
            let key = DirectKey::new(UserId::new(), UserId::new()).unwrap();
            let parsed = DirectKey::from_storage(&key.storage_key()).unwrap();
            assert_eq!(parsed, key);
        }

        #[test]
        fn from_storage_rejects_malformed_input() {
            assert!(DirectKey::from_storage("not-a-key").is_err());
            assert!(DirectKey::from_storage("abc:def").is_err());
        }

        #[test]
        fn from_storage_rejects_non_canonical_order() {
            let key = DirectKey::new(UserId::new(), UserId::new()).unwrap();
            let reversed = format!("{}:{}", key.high(), key.low());
            assert!(DirectKey::from_storage(&reversed).is_err());
        }
    }

    mod direct_conversations {
        use super::*;

        #[test]
        fn direct_has_both_participants_and_a_key() {
            let alice = UserId::new();
            let bob = UserId::new();

            let convo = Conversation::direct(alice, bob).unwrap();

            assert!(!convo.is_group());
            assert!(convo.has_participant(&alice));
            assert!(convo.has_participant(&bob));
            assert_eq!(convo.participants().len(), 2);
            assert_eq!(convo.direct_key(), Some(&DirectKey::new(alice, bob).unwrap()));
            assert_eq!(convo.title(), None);
            assert_eq!(convo.created_by(), &alice);
        }

        #[test]
        fn direct_rejects_self_pairing() {
            let alice = UserId::new();
            assert!(Conversation::direct(alice, alice).is_err());
        }

        #[test]
        fn new_conversation_starts_with_last_message_at_equal_to_created_at() {
            let convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            assert_eq!(convo.last_message_at(), convo.created_at());
        }
    }

    mod group_conversations {
        use super::*;

        #[test]
        fn group_includes_creator_and_deduplicates_members() {
            let creator = UserId::new();
            let member = UserId::new();

            let convo =
                Conversation::group(creator, vec![member, member, creator], None).unwrap();

            assert!(convo.is_group());
            assert_eq!(convo.participants().len(), 2);
            assert!(convo.has_participant(&creator));
            assert!(convo.has_participant(&member));
            assert!(convo.direct_key().is_none());
        }

        #[test]
        fn group_rejects_fewer_than_two_members() {
            let creator = UserId::new();
            assert!(Conversation::group(creator, vec![], None).is_err());
            assert!(Conversation::group(creator, vec![creator], None).is_err());
        }

        #[test]
        fn group_trims_title_and_drops_blank_titles() {
            let creator = UserId::new();
            let member = UserId::new();

            let titled =
                Conversation::group(creator, vec![member], Some("  Study Group  ".into()))
                    .unwrap();
            assert_eq!(titled.title(), Some("Study Group"));

            let blank =
                Conversation::group(creator, vec![member], Some("   ".into())).unwrap();
            assert_eq!(blank.title(), None);
        }
    }

    mod authorization {
        use super::*;

        #[test]
        fn authorize_participant_allows_members() {
            let alice = UserId::new();
            let bob = UserId::new();
            let convo = Conversation::direct(alice, bob).unwrap();

            assert!(convo.authorize_participant(&alice).is_ok());
            assert!(convo.authorize_participant(&bob).is_ok());
        }

        #[test]
        fn authorize_participant_rejects_outsiders() {
            let convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            let outsider = UserId::new();

            let err = convo.authorize_participant(&outsider).unwrap_err();
            assert_eq!(err.code, ErrorCode::Forbidden);
        }
    }

    mod message_recording {
        use super::*;

        #[test]
        fn next_message_timestamp_uses_clock_when_ahead() {
            let convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            let ahead = convo.last_message_at().plus_secs(60);

            assert_eq!(convo.next_message_timestamp(ahead), ahead);
        }

        #[test]
        fn next_message_timestamp_bumps_when_clock_lags() {
            let convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            let behind = convo.last_message_at().plus_secs(0);

            let next = convo.next_message_timestamp(behind);
            assert!(next.is_after(convo.last_message_at()));
        }

        #[test]
        fn record_message_advances_last_message_at() {
            let mut convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            let committed = convo.last_message_at().plus_secs(30);

            convo.record_message(committed);
            assert_eq!(convo.last_message_at(), &committed);
        }

        #[test]
        fn record_message_never_moves_backwards() {
            let mut convo = Conversation::direct(UserId::new(), UserId::new()).unwrap();
            let newest = convo.last_message_at().plus_secs(30);
            convo.record_message(newest);

            let stale = newest.plus_secs(0).plus_micros(-500);
            convo.record_message(stale);

            assert_eq!(convo.last_message_at(), &newest);
        }
    }
}
