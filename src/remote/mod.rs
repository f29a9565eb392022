//! # Remote Relationship Store
//!
//! The seam to the durable cross-device store and its realtime feed.
//!
//! The core treats every call here as fallible, asynchronous, and
//! authoritative once it succeeds: local state converges toward remote
//! results and never overrides them. A failed call is reported as
//! "not confirmed" while the optimistic local mutation stands; the next
//! reconciliation pass squares the difference.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::friends::{Friend, FriendRequest, NewFriend, PresenceEvent, RequestStatus};

mod sync;

pub use sync::Synchronizer;

/// Capacity of a subscriber's change feed.
const FEED_CAPACITY: usize = 64;

/// One realtime notification from the remote store.
#[derive(Debug, Clone)]
pub enum RemoteChange {
    /// The authoritative friend list for the subscribed user.
    Friends(Vec<Friend>),
    /// The request list involving the subscribed user.
    Requests(Vec<FriendRequest>),
    /// A presence transition for one of the user's friends.
    Presence(PresenceEvent),
}

/// The remote relationship store collaborator.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the authoritative friend list for `user_id`.
    async fn get_friends(&self, user_id: &str) -> Result<Vec<Friend>>;

    /// Fetch the requests involving `user_id`.
    async fn get_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>>;

    /// Record a new friend request.
    async fn send_friend_request(&self, request: &FriendRequest) -> Result<()>;

    /// Record the acceptance of a request.
    async fn accept_friend_request(&self, request_id: &str) -> Result<()>;

    /// Record the rejection of a request.
    async fn reject_friend_request(&self, request_id: &str) -> Result<()>;

    /// Dissolve the friendship between two users.
    async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<()>;

    /// Publish the user's own presence.
    async fn update_online_status(&self, user_id: &str, is_online: bool) -> Result<()>;

    /// Open the realtime change feed for `user_id`.
    async fn subscribe(&self, user_id: &str) -> Result<mpsc::Receiver<RemoteChange>>;
}

// ============================================================================
// LOOPBACK BACKEND
// ============================================================================

/// Per-process remote store for demos, tests, and offline sessions.
///
/// Keeps all users' relationship state in memory and delivers change
/// notifications to subscribers in the same process. `set_offline` makes
/// every call fail, which is how connectivity loss is simulated.
#[derive(Default)]
pub struct LoopbackRemote {
    state: Mutex<LoopbackState>,
}

#[derive(Default)]
struct LoopbackState {
    /// Friend lists keyed by owner user id
    friends: HashMap<String, Vec<Friend>>,
    /// Every request the backend has seen
    requests: Vec<FriendRequest>,
    /// Open change feeds keyed by subscriber user id
    subscribers: HashMap<String, Vec<mpsc::Sender<RemoteChange>>>,
    /// When set, every call fails
    offline: bool,
}

impl LoopbackRemote {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated connectivity loss.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn check_online(state: &LoopbackState) -> Result<()> {
        if state.offline {
            return Err(Error::Remote("loopback backend is offline".into()));
        }
        Ok(())
    }

    fn friends_of(state: &LoopbackState, user_id: &str) -> Vec<Friend> {
        state.friends.get(user_id).cloned().unwrap_or_default()
    }

    fn requests_of(state: &LoopbackState, user_id: &str) -> Vec<FriendRequest> {
        state
            .requests
            .iter()
            .filter(|r| r.involves(user_id))
            .cloned()
            .collect()
    }

    /// Queue `change` for every subscriber of `user_id`.
    ///
    /// Returns the sends to perform after the state lock is released.
    fn notifications_for(
        state: &mut LoopbackState,
        user_id: &str,
        change: RemoteChange,
    ) -> Vec<(mpsc::Sender<RemoteChange>, RemoteChange)> {
        let Some(feeds) = state.subscribers.get_mut(user_id) else {
            return Vec::new();
        };
        feeds.retain(|tx| !tx.is_closed());
        feeds
            .iter()
            .map(|tx| (tx.clone(), change.clone()))
            .collect()
    }

    async fn deliver(batch: Vec<(mpsc::Sender<RemoteChange>, RemoteChange)>) {
        for (tx, change) in batch {
            if tx.send(change).await.is_err() {
                tracing::debug!("Dropped notification for closed feed");
            }
        }
    }
}

#[async_trait]
impl RemoteStore for LoopbackRemote {
    async fn get_friends(&self, user_id: &str) -> Result<Vec<Friend>> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(Self::friends_of(&state, user_id))
    }

    async fn get_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(Self::requests_of(&state, user_id))
    }

    async fn send_friend_request(&self, request: &FriendRequest) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            Self::check_online(&state)?;

            if state.requests.iter().any(|r| r.id == request.id) {
                return Ok(());
            }
            state.requests.push(request.clone());

            let recipient = request.to_user_id.clone();
            let requests = Self::requests_of(&state, &recipient);
            Self::notifications_for(&mut state, &recipient, RemoteChange::Requests(requests))
        };

        Self::deliver(batch).await;
        Ok(())
    }

    async fn accept_friend_request(&self, request_id: &str) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            Self::check_online(&state)?;

            let request = state
                .requests
                .iter_mut()
                .find(|r| r.id == request_id)
                .ok_or_else(|| Error::Remote(format!("unknown request {}", request_id)))?;
            request.status = RequestStatus::Accepted;
            let request = request.clone();

            // Record the friendship on both sides.
            let now = crate::time::now();
            for (owner, other_id, other_name) in [
                (
                    request.from_user_id.clone(),
                    request.to_user_id.clone(),
                    request.to_user_name.clone(),
                ),
                (
                    request.to_user_id.clone(),
                    request.from_user_id.clone(),
                    request.from_user_name.clone(),
                ),
            ] {
                let list = state.friends.entry(owner).or_default();
                if !list.iter().any(|f| f.id == other_id) {
                    list.push(NewFriend::new(other_id, other_name).into_friend(now));
                }
            }

            let mut batch = Vec::new();
            for user_id in [&request.from_user_id, &request.to_user_id] {
                let requests = Self::requests_of(&state, user_id);
                let friends = Self::friends_of(&state, user_id);
                batch.extend(Self::notifications_for(
                    &mut state,
                    user_id,
                    RemoteChange::Requests(requests),
                ));
                batch.extend(Self::notifications_for(
                    &mut state,
                    user_id,
                    RemoteChange::Friends(friends),
                ));
            }
            batch
        };

        Self::deliver(batch).await;
        Ok(())
    }

    async fn reject_friend_request(&self, request_id: &str) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            Self::check_online(&state)?;

            let request = state
                .requests
                .iter_mut()
                .find(|r| r.id == request_id)
                .ok_or_else(|| Error::Remote(format!("unknown request {}", request_id)))?;
            request.status = RequestStatus::Rejected;
            let request = request.clone();

            let mut batch = Vec::new();
            for user_id in [&request.from_user_id, &request.to_user_id] {
                let requests = Self::requests_of(&state, user_id);
                batch.extend(Self::notifications_for(
                    &mut state,
                    user_id,
                    RemoteChange::Requests(requests),
                ));
            }
            batch
        };

        Self::deliver(batch).await;
        Ok(())
    }

    async fn remove_friend(&self, user_id: &str, friend_id: &str) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            Self::check_online(&state)?;

            if let Some(list) = state.friends.get_mut(user_id) {
                list.retain(|f| f.id != friend_id);
            }
            if let Some(list) = state.friends.get_mut(friend_id) {
                list.retain(|f| f.id != user_id);
            }

            let mut batch = Vec::new();
            for owner in [user_id, friend_id] {
                let friends = Self::friends_of(&state, owner);
                batch.extend(Self::notifications_for(
                    &mut state,
                    owner,
                    RemoteChange::Friends(friends),
                ));
            }
            batch
        };

        Self::deliver(batch).await;
        Ok(())
    }

    async fn update_online_status(&self, user_id: &str, is_online: bool) -> Result<()> {
        let batch = {
            let mut state = self.state.lock();
            Self::check_online(&state)?;

            let event = PresenceEvent {
                friend_id: user_id.to_string(),
                is_online,
                timestamp: crate::time::now(),
            };

            // Everyone holding this user as a friend hears about it.
            let watchers: Vec<String> = state
                .friends
                .iter()
                .filter(|(_, list)| list.iter().any(|f| f.id == user_id))
                .map(|(owner, _)| owner.clone())
                .collect();

            let mut batch = Vec::new();
            for owner in watchers {
                batch.extend(Self::notifications_for(
                    &mut state,
                    &owner,
                    RemoteChange::Presence(event.clone()),
                ));
            }
            batch
        };

        Self::deliver(batch).await;
        Ok(())
    }

    async fn subscribe(&self, user_id: &str) -> Result<mpsc::Receiver<RemoteChange>> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        state
            .subscribers
            .entry(user_id.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserProfile;

    fn request(from: (&str, &str), to: (&str, &str)) -> FriendRequest {
        FriendRequest::new(
            &UserProfile::new(from.0, from.1),
            to.0,
            to.1,
            None,
            crate::time::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_accept_records_friendship_on_both_sides() {
        let remote = LoopbackRemote::new();
        let req = request(("u1", "Asha"), ("u2", "Bela"));

        remote.send_friend_request(&req).await.unwrap();
        remote.accept_friend_request(&req.id).await.unwrap();

        let asha_friends = remote.get_friends("u1").await.unwrap();
        let bela_friends = remote.get_friends("u2").await.unwrap();
        assert_eq!(asha_friends.len(), 1);
        assert_eq!(asha_friends[0].id, "u2");
        assert_eq!(bela_friends[0].id, "u1");

        // Accepting again must not duplicate entries.
        remote.accept_friend_request(&req.id).await.unwrap();
        assert_eq!(remote.get_friends("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_hears_incoming_request() {
        let remote = LoopbackRemote::new();
        let mut feed = remote.subscribe("u2").await.unwrap();

        let req = request(("u1", "Asha"), ("u2", "Bela"));
        remote.send_friend_request(&req).await.unwrap();

        match feed.recv().await.unwrap() {
            RemoteChange::Requests(requests) => {
                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].id, req.id);
            }
            other => panic!("unexpected change: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_presence_reaches_friends_only() {
        let remote = LoopbackRemote::new();
        let req = request(("u1", "Asha"), ("u2", "Bela"));
        remote.send_friend_request(&req).await.unwrap();
        remote.accept_friend_request(&req.id).await.unwrap();

        let mut bela_feed = remote.subscribe("u2").await.unwrap();
        let mut stranger_feed = remote.subscribe("u9").await.unwrap();

        remote.update_online_status("u1", true).await.unwrap();

        match bela_feed.recv().await.unwrap() {
            RemoteChange::Presence(event) => {
                assert_eq!(event.friend_id, "u1");
                assert!(event.is_online);
            }
            other => panic!("unexpected change: {:?}", other),
        }
        assert!(stranger_feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_friend_is_mutual() {
        let remote = LoopbackRemote::new();
        let req = request(("u1", "Asha"), ("u2", "Bela"));
        remote.send_friend_request(&req).await.unwrap();
        remote.accept_friend_request(&req.id).await.unwrap();

        remote.remove_friend("u1", "u2").await.unwrap();

        assert!(remote.get_friends("u1").await.unwrap().is_empty());
        assert!(remote.get_friends("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_backend_fails_calls() {
        let remote = LoopbackRemote::new();
        remote.set_offline(true);

        let result = remote.get_friends("u1").await;
        assert!(matches!(result, Err(Error::Remote(_))));

        remote.set_offline(false);
        assert!(remote.get_friends("u1").await.is_ok());
    }
}
