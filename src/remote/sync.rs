//! # Remote Synchronization
//!
//! Converges local state toward the remote store and drains its realtime
//! feed.
//!
//! All remote input reaches the roster through one receive loop, so feed
//! notifications are applied in arrival order on a single mutation path.
//! Reconciliation is remote-wins: local entries that diverge are corrected
//! and the correction is announced as a [`SocialEvent::Synced`] rather than
//! silently absorbed.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::{RemoteChange, RemoteStore};
use crate::auth::EntitlementProvider;
use crate::error::Result;
use crate::events::SocialEvent;
use crate::friends::roster::{AddOutcome, FriendRoster, SyncDiff};
use crate::friends::{FriendRequest, PresenceTracker, RequestBook, RequestStatus};

/// Reconciles local state against the remote relationship store.
pub struct Synchronizer {
    /// Whose relationships this session mirrors
    user_id: String,
    /// The authoritative store
    remote: Arc<dyn RemoteStore>,
    /// Local registry to converge
    roster: Arc<FriendRoster>,
    /// Local request book to converge
    requests: Arc<RequestBook>,
    /// Premium flag source for acceptance promotions
    entitlement: Arc<dyn EntitlementProvider>,
    /// Presence observations route through the tracker
    presence: PresenceTracker,
    /// Outbound notifications for the application shell
    events: broadcast::Sender<SocialEvent>,
}

impl Synchronizer {
    /// Wire a synchronizer over the session's shared components.
    pub fn new(
        user_id: String,
        remote: Arc<dyn RemoteStore>,
        roster: Arc<FriendRoster>,
        requests: Arc<RequestBook>,
        entitlement: Arc<dyn EntitlementProvider>,
        events: broadcast::Sender<SocialEvent>,
    ) -> Self {
        let presence = PresenceTracker::new(roster.clone(), events.clone());
        Self {
            user_id,
            remote,
            roster,
            requests,
            entitlement,
            presence,
            events,
        }
    }

    /// Pull the remote state once and converge local state toward it.
    ///
    /// Returns what changed in the roster.
    pub async fn refresh(&self) -> Result<SyncDiff> {
        let friends = self.remote.get_friends(&self.user_id).await?;
        let requests = self.remote.get_pending_requests(&self.user_id).await?;

        let diff = self.apply_friends(friends);
        self.apply_requests(requests);
        Ok(diff)
    }

    /// Apply one realtime notification.
    pub fn apply(&self, change: RemoteChange) {
        match change {
            RemoteChange::Friends(friends) => {
                self.apply_friends(friends);
            }
            RemoteChange::Requests(requests) => self.apply_requests(requests),
            RemoteChange::Presence(event) => {
                self.presence.apply(&event);
            }
        }
    }

    /// Drain the realtime feed until the remote side closes it.
    pub async fn run(self, mut feed: mpsc::Receiver<RemoteChange>) {
        while let Some(change) = feed.recv().await {
            self.apply(change);
        }
        tracing::info!("Remote change feed closed for {}", self.user_id);
    }

    fn apply_friends(&self, remote: Vec<crate::friends::Friend>) -> SyncDiff {
        let diff = self.roster.sync_from_remote(remote);
        if !diff.is_empty() {
            let _ = self.events.send(SocialEvent::Synced {
                added: diff.added,
                removed: diff.removed,
                updated: diff.updated,
            });
        }
        diff
    }

    fn apply_requests(&self, remote: Vec<FriendRequest>) {
        let report = self.requests.sync_from_remote(remote);

        for request in &report.received {
            if request.to_user_id == self.user_id {
                let _ = self.events.send(SocialEvent::RequestReceived {
                    request: request.clone(),
                });
            }
        }

        for request in report.resolved {
            let _ = self.events.send(SocialEvent::RequestResolved {
                id: request.id.clone(),
                status: request.status,
            });

            if request.status == RequestStatus::Accepted {
                self.promote_accepted(&request);
            }
        }
    }

    /// Promote the counterpart of a remotely accepted request into the
    /// roster. The local quota still applies; a denial leaves the request
    /// accepted and is logged for the next reconciliation to surface.
    fn promote_accepted(&self, request: &FriendRequest) {
        let Some(candidate) = request.counterpart_of(&self.user_id) else {
            return;
        };

        match self
            .roster
            .add_friend(candidate, self.entitlement.is_premium())
        {
            Ok(AddOutcome::Added(friend)) => {
                let _ = self.events.send(SocialEvent::FriendAdded { friend });
            }
            Ok(AddOutcome::AlreadyFriend) => {}
            Err(err) => {
                tracing::warn!(
                    code = err.code(),
                    "Accepted request {} but local add failed: {}",
                    request.id,
                    err
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StaticEntitlement, UserProfile};
    use crate::friends::{NewFriend, PresenceEvent};
    use crate::quota::QuotaPolicy;
    use crate::remote::LoopbackRemote;
    use crate::storage::MemorySnapshotStore;
    use crate::time::SystemClock;

    struct Fixture {
        synchronizer: Synchronizer,
        roster: Arc<FriendRoster>,
        requests: Arc<RequestBook>,
        remote: Arc<LoopbackRemote>,
        events: broadcast::Receiver<SocialEvent>,
    }

    fn fixture(user_id: &str) -> Fixture {
        let clock = Arc::new(SystemClock);
        let roster = Arc::new(FriendRoster::new(
            Arc::new(MemorySnapshotStore::new()),
            QuotaPolicy::default(),
            clock.clone(),
        ));
        let requests = Arc::new(RequestBook::new(clock));
        let remote = Arc::new(LoopbackRemote::new());
        let (tx, events) = broadcast::channel(32);

        let synchronizer = Synchronizer::new(
            user_id.to_string(),
            remote.clone(),
            roster.clone(),
            requests.clone(),
            Arc::new(StaticEntitlement::free()),
            tx,
        );

        Fixture {
            synchronizer,
            roster,
            requests,
            remote,
            events,
        }
    }

    fn drain(events: &mut broadcast::Receiver<SocialEvent>) -> Vec<SocialEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test]
    async fn test_refresh_converges_roster_to_remote() {
        let mut fx = fixture("u1");

        // Remote knows a friendship this device has never seen.
        let req = FriendRequest::new(
            &UserProfile::new("u1", "Asha"),
            "u2",
            "Bela",
            None,
            crate::time::now(),
        )
        .unwrap();
        fx.remote.send_friend_request(&req).await.unwrap();
        fx.remote.accept_friend_request(&req.id).await.unwrap();

        let diff = fx.synchronizer.refresh().await.unwrap();
        assert_eq!(diff.added, 1);
        assert!(fx.roster.get_by_id("u2").is_some());

        let seen = drain(&mut fx.events);
        assert!(seen.iter().any(|e| matches!(e, SocialEvent::Synced { added: 1, .. })));
    }

    #[tokio::test]
    async fn test_incoming_pending_request_raises_event() {
        let mut fx = fixture("u2");

        let req = FriendRequest::new(
            &UserProfile::new("u1", "Asha"),
            "u2",
            "Bela",
            Some("Hi!".into()),
            crate::time::now(),
        )
        .unwrap();

        fx.synchronizer.apply(RemoteChange::Requests(vec![req.clone()]));

        assert_eq!(fx.requests.pending_incoming_count("u2"), 1);
        let seen = drain(&mut fx.events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, SocialEvent::RequestReceived { request } if request.id == req.id)));
    }

    #[tokio::test]
    async fn test_remotely_accepted_request_promotes_counterpart() {
        let mut fx = fixture("u1");

        // This device sent the request earlier.
        let pending = fx
            .requests
            .send(&UserProfile::new("u1", "Asha"), "u2", "Bela", None)
            .unwrap();

        // The recipient accepted on another device.
        let mut accepted = pending.clone();
        accepted.status = RequestStatus::Accepted;
        fx.synchronizer.apply(RemoteChange::Requests(vec![accepted]));

        assert!(fx.roster.get_by_id("u2").is_some());
        let seen = drain(&mut fx.events);
        assert!(seen
            .iter()
            .any(|e| matches!(e, SocialEvent::RequestResolved { status: RequestStatus::Accepted, .. })));
        assert!(seen
            .iter()
            .any(|e| matches!(e, SocialEvent::FriendAdded { friend } if friend.id == "u2")));
    }

    #[tokio::test]
    async fn test_presence_change_routes_to_roster() {
        let fx = fixture("u1");
        fx.roster
            .add_friend(NewFriend::new("u2", "Bela"), false)
            .unwrap();

        let at = crate::time::now();
        fx.synchronizer.apply(RemoteChange::Presence(PresenceEvent {
            friend_id: "u2".into(),
            is_online: false,
            timestamp: at,
        }));

        let friend = fx.roster.get_by_id("u2").unwrap();
        assert!(!friend.is_online);
        assert_eq!(friend.last_seen, Some(at));
    }

    #[tokio::test]
    async fn test_run_drains_feed_from_loopback() {
        let fx = fixture("u2");
        let feed = fx.remote.subscribe("u2").await.unwrap();
        let handle = tokio::spawn(fx.synchronizer.run(feed));

        let req = FriendRequest::new(
            &UserProfile::new("u1", "Asha"),
            "u2",
            "Bela",
            None,
            crate::time::now(),
        )
        .unwrap();
        fx.remote.send_friend_request(&req).await.unwrap();
        fx.remote.accept_friend_request(&req.id).await.unwrap();

        // Give the loop a moment to drain, then close the backend feed.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(fx.roster.get_by_id("u1").is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_refresh_fails_while_offline() {
        let fx = fixture("u1");
        fx.remote.set_offline(true);

        let result = fx.synchronizer.refresh().await;
        assert!(matches!(result, Err(crate::error::Error::Remote(_))));
        assert!(result.unwrap_err().is_recoverable());
    }
}
