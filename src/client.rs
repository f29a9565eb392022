//! # Social Client
//!
//! The session-level facade that wires the roster, the request book, the
//! snapshot store, and the remote collaborators together.
//!
//! One client is constructed per signed-in session by the application's
//! composition root and passed by reference to consumers. There is no
//! global instance; every dependency is injected, which keeps quota checks
//! and timestamps testable.
//!
//! Mutations are optimistic: they apply locally first, then the matching
//! remote call runs. When the remote call fails the local mutation stands
//! and the result reports `confirmed: false`, alongside a
//! [`SocialEvent::NotConfirmed`] broadcast. A later [`SocialClient::refresh`]
//! or feed notification converges the two sides.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::auth::{AuthProvider, EntitlementProvider, UserProfile};
use crate::error::{Error, Result};
use crate::events::SocialEvent;
use crate::friends::roster::AddOutcome;
use crate::friends::{
    AcceptOutcome, Friend, FriendRequest, FriendRoster, FriendsStats, NewFriend, RequestBook,
};
use crate::quota::QuotaPolicy;
use crate::remote::{RemoteStore, Synchronizer};
use crate::storage::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
use crate::time::{Clock, SystemClock};
use crate::SocialConfig;

/// Capacity of the outbound event channel.
const EVENT_CAPACITY: usize = 64;

/// A local result plus whether the remote store confirmed it.
///
/// `confirmed: false` means the local mutation stands but the remote call
/// failed; the operation is applied, not lost, and reconciliation will
/// square it later.
#[derive(Debug)]
pub struct Confirmed<T> {
    /// The local outcome.
    pub value: T,
    /// Whether the remote store acknowledged the operation.
    pub confirmed: bool,
}

impl<T> Confirmed<T> {
    fn new(value: T, confirmed: bool) -> Self {
        Self { value, confirmed }
    }
}

/// The client-side social graph for one signed-in session.
pub struct SocialClient {
    /// The signed-in user
    user: UserProfile,
    /// The canonical local friend collection
    roster: Arc<FriendRoster>,
    /// The local request book
    requests: Arc<RequestBook>,
    /// The authoritative remote store
    remote: Arc<dyn RemoteStore>,
    /// Premium flag source
    entitlement: Arc<dyn EntitlementProvider>,
    /// Outbound notifications for the application shell
    events: broadcast::Sender<SocialEvent>,
    /// Timestamp source
    clock: Arc<dyn Clock>,
}

impl SocialClient {
    /// Build a client with every dependency supplied explicitly.
    ///
    /// Restores the roster from the snapshot store, so a session resumes
    /// with its last known friend list before any remote contact.
    pub fn new(
        config: &SocialConfig,
        auth: &dyn AuthProvider,
        entitlement: Arc<dyn EntitlementProvider>,
        remote: Arc<dyn RemoteStore>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let user = auth.current_user().ok_or(Error::NotAuthenticated)?;

        let quota = QuotaPolicy::with_limit(config.free_friend_limit);
        let roster = Arc::new(FriendRoster::new(store, quota, clock.clone()));
        roster.load();

        let requests = Arc::new(RequestBook::new(clock.clone()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        tracing::info!("Social client ready for {}", user.id);
        Ok(Self {
            user,
            roster,
            requests,
            remote,
            entitlement,
            events,
            clock,
        })
    }

    /// Build a client from configuration, choosing the snapshot backing
    /// from `config.snapshot_path` and using the system clock.
    pub fn open(
        config: &SocialConfig,
        auth: &dyn AuthProvider,
        entitlement: Arc<dyn EntitlementProvider>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self> {
        let store: Arc<dyn SnapshotStore> = match config.snapshot_path.as_deref() {
            Some(path) => Arc::new(SqliteSnapshotStore::open(Some(path))?),
            None => Arc::new(MemorySnapshotStore::new()),
        };
        Self::new(
            config,
            auth,
            entitlement,
            remote,
            store,
            Arc::new(SystemClock),
        )
    }

    /// The signed-in user this client serves.
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Subscribe to the client's event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SocialEvent> {
        self.events.subscribe()
    }

    /// Open the realtime feed and start converging in the background.
    ///
    /// Fails when the subscription itself cannot be opened; the client
    /// remains usable offline and `start` can be retried. The initial pull
    /// runs best-effort, the spawned loop converges from there.
    pub async fn start(&self) -> Result<()> {
        let feed = self.remote.subscribe(&self.user.id).await?;
        let synchronizer = self.synchronizer();

        if let Err(err) = synchronizer.refresh().await {
            tracing::warn!(code = err.code(), "Initial refresh failed: {}", err);
        }

        tokio::spawn(self.synchronizer().run(feed));
        tracing::info!("Started realtime sync for {}", self.user.id);
        Ok(())
    }

    // ========================================================================
    // ROSTER OPERATIONS (local)
    // ========================================================================

    /// Add a friend directly, importing a pre-existing relationship.
    pub fn add_friend(&self, candidate: NewFriend) -> Result<AddOutcome> {
        let outcome = self
            .roster
            .add_friend(candidate, self.entitlement.is_premium())?;

        if let AddOutcome::Added(friend) = &outcome {
            let _ = self.events.send(SocialEvent::FriendAdded {
                friend: friend.clone(),
            });
        }
        Ok(outcome)
    }

    /// Apply a presence transition observed now.
    pub fn update_status(&self, id: &str, is_online: bool) -> bool {
        let applied = self.roster.update_status(id, is_online, self.clock.now());
        if applied {
            let _ = self.events.send(SocialEvent::PresenceChanged {
                id: id.to_string(),
                is_online,
            });
        }
        applied
    }

    /// Get a friend by id.
    pub fn get_friend(&self, id: &str) -> Option<Friend> {
        self.roster.get_by_id(id)
    }

    /// The friend collection in insertion order.
    pub fn friends(&self) -> Vec<Friend> {
        self.roster.list()
    }

    /// Whether the quota allows one more friend right now.
    pub fn can_add_more(&self) -> bool {
        self.roster.can_add_more(self.entitlement.is_premium())
    }

    /// The configured free-tier limit.
    pub fn free_limit(&self) -> usize {
        self.roster.free_limit()
    }

    /// Flip the favorite flag on a friend.
    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        self.roster.toggle_favorite(id)
    }

    /// Set or clear a user-local nickname.
    pub fn set_nickname(&self, id: &str, nickname: Option<String>) -> Result<()> {
        self.roster.set_nickname(id, nickname)
    }

    /// Derived counters for the application shell.
    pub fn stats(&self) -> FriendsStats {
        let friends = self.roster.list();
        let is_premium = self.entitlement.is_premium();

        FriendsStats {
            total: friends.len(),
            online: friends.iter().filter(|f| f.is_online).count(),
            favorites: friends.iter().filter(|f| f.is_favorite).count(),
            pending_requests: self.requests.pending_incoming_count(&self.user.id),
            remaining_free_slots: if is_premium {
                None
            } else {
                Some(self.roster.free_limit().saturating_sub(friends.len()))
            },
        }
    }

    /// Pending requests addressed to or sent by the signed-in user.
    pub fn pending_requests(&self) -> Vec<FriendRequest> {
        self.requests.list_pending(&self.user.id)
    }

    // ========================================================================
    // REQUEST OPERATIONS (optimistic local + remote confirmation)
    // ========================================================================

    /// Send a friend request.
    pub async fn send_request(
        &self,
        to_user_id: &str,
        to_user_name: &str,
        message: Option<String>,
    ) -> Result<Confirmed<FriendRequest>> {
        let request = self
            .requests
            .send(&self.user, to_user_id, to_user_name, message)?;

        let result = self.remote.send_friend_request(&request).await;
        Ok(Confirmed::new(
            request,
            self.report_confirmation("send_request", result),
        ))
    }

    /// Accept a pending request addressed to this user.
    pub async fn accept_request(&self, request_id: &str) -> Result<Confirmed<AcceptOutcome>> {
        let outcome = self.requests.accept(
            request_id,
            &self.user.id,
            &self.roster,
            self.entitlement.is_premium(),
        )?;

        let _ = self.events.send(SocialEvent::RequestResolved {
            id: request_id.to_string(),
            status: crate::friends::RequestStatus::Accepted,
        });
        if let AcceptOutcome::Added(friend) = &outcome {
            let _ = self.events.send(SocialEvent::FriendAdded {
                friend: friend.clone(),
            });
        }

        let result = self.remote.accept_friend_request(request_id).await;
        Ok(Confirmed::new(
            outcome,
            self.report_confirmation("accept_request", result),
        ))
    }

    /// Reject a pending request.
    pub async fn reject_request(&self, request_id: &str) -> Result<Confirmed<FriendRequest>> {
        let rejected = self.requests.reject(request_id)?;

        let _ = self.events.send(SocialEvent::RequestResolved {
            id: request_id.to_string(),
            status: crate::friends::RequestStatus::Rejected,
        });

        let result = self.remote.reject_friend_request(request_id).await;
        Ok(Confirmed::new(
            rejected,
            self.report_confirmation("reject_request", result),
        ))
    }

    /// Remove a friend locally and dissolve the friendship remotely.
    ///
    /// The remote call runs even when the entry was already gone locally,
    /// so a half-removed friendship still converges.
    pub async fn remove_friend(&self, id: &str) -> Result<Confirmed<bool>> {
        let removed = self.roster.remove_friend(id);
        if removed {
            let _ = self
                .events
                .send(SocialEvent::FriendRemoved { id: id.to_string() });
        }

        let result = self.remote.remove_friend(&self.user.id, id).await;
        Ok(Confirmed::new(
            removed,
            self.report_confirmation("remove_friend", result),
        ))
    }

    /// Publish this user's own presence to the remote store.
    pub async fn set_online(&self, is_online: bool) -> Result<()> {
        self.remote
            .update_online_status(&self.user.id, is_online)
            .await
    }

    /// Pull the remote state once and converge toward it.
    ///
    /// Returns fresh stats computed after the pass.
    pub async fn refresh(&self) -> Result<FriendsStats> {
        self.synchronizer().refresh().await?;
        Ok(self.stats())
    }

    fn synchronizer(&self) -> Synchronizer {
        Synchronizer::new(
            self.user.id.clone(),
            self.remote.clone(),
            self.roster.clone(),
            self.requests.clone(),
            self.entitlement.clone(),
            self.events.clone(),
        )
    }

    /// Log and broadcast an unconfirmed remote call; returns the flag.
    fn report_confirmation(&self, action: &'static str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    code = err.code(),
                    "{} applied locally but not confirmed: {}",
                    action,
                    err
                );
                let _ = self.events.send(SocialEvent::NotConfirmed {
                    action,
                    code: err.code(),
                });
                false
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
