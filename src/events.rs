//! # Social Events
//!
//! Events emitted by the social core for the application shell to handle.
//!
//! Subscribers receive them over a `tokio::sync::broadcast` channel obtained
//! from the client. Events describe state that has already changed locally;
//! a [`SocialEvent::NotConfirmed`] follows an optimistic mutation whose
//! remote confirmation failed, and [`SocialEvent::Synced`] follows a
//! reconciliation pass that corrected local state toward the remote store.

use crate::friends::{Friend, FriendRequest, RequestStatus};

/// Events emitted by the social core.
#[derive(Debug, Clone)]
pub enum SocialEvent {
    /// A friend entered the roster.
    FriendAdded {
        /// The new roster entry.
        friend: Friend,
    },

    /// A friend was removed from the roster.
    FriendRemoved {
        /// Id of the removed friend.
        id: String,
    },

    /// A friend's presence changed.
    PresenceChanged {
        /// Id of the friend.
        id: String,
        /// New online flag.
        is_online: bool,
    },

    /// A pending friend request arrived from the remote store.
    RequestReceived {
        /// The pending request.
        request: FriendRequest,
    },

    /// A friend request reached a terminal state.
    RequestResolved {
        /// Id of the settled request.
        id: String,
        /// The terminal status.
        status: RequestStatus,
    },

    /// A reconciliation pass converged local state toward the remote store.
    Synced {
        /// Entries added locally.
        added: usize,
        /// Entries removed locally.
        removed: usize,
        /// Entries whose fields changed.
        updated: usize,
    },

    /// A remote call failed after the local mutation was already applied.
    NotConfirmed {
        /// Short name of the unconfirmed operation.
        action: &'static str,
        /// Error code of the remote failure.
        code: i32,
    },
}

impl SocialEvent {
    /// Get the friend id associated with this event, if any.
    pub fn friend_id(&self) -> Option<&str> {
        match self {
            Self::FriendAdded { friend } => Some(&friend.id),
            Self::FriendRemoved { id } => Some(id),
            Self::PresenceChanged { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Check if this is a roster-membership event.
    pub fn is_roster_event(&self) -> bool {
        matches!(self, Self::FriendAdded { .. } | Self::FriendRemoved { .. })
    }

    /// Check if this is a request-lifecycle event.
    pub fn is_request_event(&self) -> bool {
        matches!(
            self,
            Self::RequestReceived { .. } | Self::RequestResolved { .. }
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friend_id_extraction() {
        let event = SocialEvent::FriendRemoved { id: "f1".into() };
        assert_eq!(event.friend_id(), Some("f1"));

        let event = SocialEvent::Synced {
            added: 1,
            removed: 0,
            updated: 0,
        };
        assert_eq!(event.friend_id(), None);
    }

    #[test]
    fn test_event_classification() {
        let event = SocialEvent::FriendRemoved { id: "f1".into() };
        assert!(event.is_roster_event());
        assert!(!event.is_request_event());

        let event = SocialEvent::RequestResolved {
            id: "r1".into(),
            status: RequestStatus::Accepted,
        };
        assert!(event.is_request_event());
    }
}
