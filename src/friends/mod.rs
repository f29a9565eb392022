//! # Friends Module
//!
//! Friend relationship management: the roster of confirmed friends, the
//! request lifecycle, and presence tracking.
//!
//! ## Friend Request Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FRIEND REQUEST FLOW                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Asha (Sender)                               Bela (Recipient)           │
//! │  ─────────────────────────────────────────────────────────────          │
//! │                                                                         │
//! │  1. Send Request                                                        │
//! │  ┌─────────────────────┐                                                │
//! │  │ FriendRequest {     │                                                │
//! │  │   id: uuid,         │                                                │
//! │  │   from: asha,       │  ──────────────────────►                       │
//! │  │   to: bela,         │                          2. Pending request    │
//! │  │   message: "Hi!",   │                          shows in Bela's       │
//! │  │   status: Pending   │                          inbox                 │
//! │  │ }                   │                                 │              │
//! │  └─────────────────────┘                                 ▼              │
//! │                                                  3. Accept / Reject     │
//! │                                                  (terminal, one-way)    │
//! │                         ◄────────────────────────────────┤              │
//! │  4. On accept, each device promotes the                  │              │
//! │     counterpart into its own roster,                     ▼              │
//! │     subject to that device's quota            Bela's roster gains Asha  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A request settles exactly once. Accepting an already-settled request is
//! rejected with `InvalidRequestState` and changes nothing, so replayed
//! remote notifications cannot duplicate roster entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::UserProfile;
use crate::error::{Error, Result};

pub mod presence;
pub mod requests;
pub mod roster;

pub use presence::{PresenceEvent, PresenceTracker};
pub use requests::{AcceptOutcome, RequestBook};
pub use roster::{AddOutcome, FriendRoster, SyncDiff};

/// A confirmed friend held in the local roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    /// Stable id, unique within the roster.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar image reference. `None` means the shell renders its default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Current online flag.
    pub is_online: bool,
    /// When the friend was last seen. Defined only while offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    /// When the friendship entered this roster. Never changes afterwards.
    pub added_at: DateTime<Utc>,
    /// User-local favorite flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_favorite: bool,
    /// User-local display-name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Friend {
    /// The name the shell should display: the nickname when set, otherwise
    /// the friend's own name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }

    /// Apply a presence transition observed at `at`.
    ///
    /// Going offline records `at` as the last-seen instant; coming online
    /// clears it. Re-applying an offline transition refreshes the last-seen
    /// instant to the later observation.
    pub fn apply_presence(&mut self, is_online: bool, at: DateTime<Utc>) {
        self.is_online = is_online;
        self.last_seen = if is_online { None } else { Some(at) };
    }
}

/// A candidate for [`FriendRoster::add_friend`](roster::FriendRoster::add_friend).
///
/// Carries only the caller-supplied fields; the roster stamps `added_at` and
/// presence defaults when it admits the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFriend {
    /// Stable id of the user being added.
    pub id: String,
    /// Display name of the user being added.
    pub name: String,
    /// Optional avatar reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl NewFriend {
    /// Convenience constructor without an avatar.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }

    /// Check the candidate carries the required fields.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidFriendData("missing id".into()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::InvalidFriendData("missing name".into()));
        }
        Ok(())
    }

    /// Promote the candidate into a roster entry created at `added_at`.
    pub fn into_friend(self, added_at: DateTime<Utc>) -> Friend {
        Friend {
            id: self.id,
            name: self.name,
            avatar: self.avatar,
            is_online: false,
            last_seen: None,
            added_at,
            is_favorite: false,
            nickname: None,
        }
    }
}

/// Status of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for the recipient's decision.
    Pending,
    /// Request was accepted. Terminal.
    Accepted,
    /// Request was rejected. Terminal.
    Rejected,
}

impl RequestStatus {
    /// Convert to a storage/wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Parse from a storage/wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    /// Whether this status can never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// A proposed friendship awaiting the recipient's decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    /// Unique request id.
    pub id: String,
    /// Id of the requester.
    pub from_user_id: String,
    /// Display name of the requester.
    pub from_user_name: String,
    /// Id of the recipient.
    pub to_user_id: String,
    /// Display name of the recipient.
    pub to_user_name: String,
    /// Optional message shown with the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Lifecycle status. Moves forward only.
    pub status: RequestStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Create a new pending request from `from` to the given recipient.
    pub fn new(
        from: &UserProfile,
        to_user_id: impl Into<String>,
        to_user_name: impl Into<String>,
        message: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let to_user_id = to_user_id.into();
        if to_user_id.trim().is_empty() {
            return Err(Error::InvalidRecipient);
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            from_user_id: from.id.clone(),
            from_user_name: from.name.clone(),
            to_user_id,
            to_user_name: to_user_name.into(),
            message,
            status: RequestStatus::Pending,
            created_at,
        })
    }

    /// Whether the request is still awaiting a decision.
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Whether `user_id` is the sender or the recipient.
    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }

    /// The participant opposite `user_id`, as a roster candidate.
    ///
    /// Returns `None` when `user_id` is not a participant.
    pub fn counterpart_of(&self, user_id: &str) -> Option<NewFriend> {
        if self.from_user_id == user_id {
            Some(NewFriend::new(&self.to_user_id, &self.to_user_name))
        } else if self.to_user_id == user_id {
            Some(NewFriend::new(&self.from_user_id, &self.from_user_name))
        } else {
            None
        }
    }
}

/// Derived counters surfaced to the application shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsStats {
    /// Friends in the roster.
    pub total: usize,
    /// Friends currently online.
    pub online: usize,
    /// Friends marked as favorites.
    pub favorites: usize,
    /// Pending requests addressed to the current user.
    pub pending_requests: usize,
    /// Free-tier slots left. `None` for premium accounts.
    pub remaining_free_slots: Option<usize>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_candidate_validation() {
        assert!(NewFriend::new("u2", "Bela").validate().is_ok());

        let missing_id = NewFriend::new("", "Bela");
        assert!(matches!(
            missing_id.validate(),
            Err(Error::InvalidFriendData(_))
        ));

        let missing_name = NewFriend::new("u2", "  ");
        assert!(matches!(
            missing_name.validate(),
            Err(Error::InvalidFriendData(_))
        ));
    }

    #[test]
    fn test_candidate_promotion_stamps_creation_time() {
        let at = sample_instant();
        let friend = NewFriend::new("u2", "Bela").into_friend(at);

        assert_eq!(friend.added_at, at);
        assert!(!friend.is_online);
        assert!(friend.last_seen.is_none());
        assert!(!friend.is_favorite);
    }

    #[test]
    fn test_presence_transition_tracks_last_seen() {
        let at = sample_instant();
        let mut friend = NewFriend::new("u2", "Bela").into_friend(at);

        friend.apply_presence(true, at);
        assert!(friend.is_online);
        assert!(friend.last_seen.is_none());

        let later = at + chrono::Duration::seconds(30);
        friend.apply_presence(false, later);
        assert!(!friend.is_online);
        assert_eq!(friend.last_seen, Some(later));
    }

    #[test]
    fn test_display_name_prefers_nickname() {
        let mut friend = NewFriend::new("u2", "Bela").into_friend(sample_instant());
        assert_eq!(friend.display_name(), "Bela");

        friend.nickname = Some("Bee".into());
        assert_eq!(friend.display_name(), "Bee");
    }

    #[test]
    fn test_request_rejects_empty_recipient() {
        let asha = UserProfile::new("u1", "Asha");
        let result = FriendRequest::new(&asha, "", "Bela", None, sample_instant());
        assert!(matches!(result, Err(Error::InvalidRecipient)));
    }

    #[test]
    fn test_request_counterpart() {
        let asha = UserProfile::new("u1", "Asha");
        let request =
            FriendRequest::new(&asha, "u2", "Bela", Some("Hi!".into()), sample_instant()).unwrap();

        let from_ashas_view = request.counterpart_of("u1").unwrap();
        assert_eq!(from_ashas_view.id, "u2");
        assert_eq!(from_ashas_view.name, "Bela");

        let from_belas_view = request.counterpart_of("u2").unwrap();
        assert_eq!(from_belas_view.id, "u1");
        assert_eq!(from_belas_view.name, "Asha");

        assert!(request.counterpart_of("u3").is_none());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(RequestStatus::Pending.as_str(), "pending");
        assert_eq!(RequestStatus::Accepted.as_str(), "accepted");
        assert_eq!(
            RequestStatus::parse("rejected"),
            Some(RequestStatus::Rejected)
        );
        assert_eq!(RequestStatus::parse("invalid"), None);
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }

    #[test]
    fn test_friend_json_roundtrip_keeps_second_precision() {
        let at = sample_instant();
        let mut friend = NewFriend::new("u2", "Bela").into_friend(at);
        friend.apply_presence(false, at + chrono::Duration::seconds(5));

        let json = serde_json::to_string(&friend).unwrap();
        let restored: Friend = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, friend);
        assert_eq!(restored.added_at.timestamp(), at.timestamp());
    }
}
