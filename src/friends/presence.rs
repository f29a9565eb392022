//! # Presence Tracker
//!
//! Applies online/offline notifications from the realtime collaborator to
//! the roster.
//!
//! Events are applied in arrival order with no reordering or deduplication.
//! The roster's own idempotence makes replays safe; a repeated offline
//! observation only refreshes the last-seen instant to the later timestamp.
//! Updates for ids not in the roster are dropped, never materialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::roster::FriendRoster;
use crate::events::SocialEvent;

/// One presence observation from the realtime feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    /// Which friend the observation concerns.
    pub friend_id: String,
    /// Observed online flag.
    pub is_online: bool,
    /// When the collaborator observed the transition.
    pub timestamp: DateTime<Utc>,
}

/// Feeds presence observations into the roster.
pub struct PresenceTracker {
    /// The roster receiving the transitions
    roster: Arc<FriendRoster>,
    /// Outbound notifications for the application shell
    events: broadcast::Sender<SocialEvent>,
}

impl PresenceTracker {
    /// Create a tracker bound to a roster and an event channel.
    pub fn new(roster: Arc<FriendRoster>, events: broadcast::Sender<SocialEvent>) -> Self {
        Self { roster, events }
    }

    /// Apply one observation. Returns whether a roster entry changed.
    pub fn apply(&self, event: &PresenceEvent) -> bool {
        let applied = self
            .roster
            .update_status(&event.friend_id, event.is_online, event.timestamp);

        if applied {
            let _ = self.events.send(SocialEvent::PresenceChanged {
                id: event.friend_id.clone(),
                is_online: event.is_online,
            });
        }
        applied
    }

    /// Drain a presence feed until the sender side closes.
    ///
    /// The single receive loop is what serializes feed observations onto
    /// the roster's mutation path.
    pub async fn run(self, mut feed: mpsc::Receiver<PresenceEvent>) {
        while let Some(event) = feed.recv().await {
            self.apply(&event);
        }
        tracing::debug!("Presence feed closed");
    }
}

// ============================================================================
// TESTS
// ============================================================================
