//! # Friend Request Workflow
//!
//! The lifecycle of outgoing and incoming friend requests.
//!
//! A request is born `pending` and settles exactly once, to `accepted` or
//! `rejected`. Settled requests are immutable: any further transition
//! attempt fails with `InvalidRequestState` and changes nothing. Acceptance
//! promotes the counterpart participant into the local roster; the promotion
//! is subject to this device's quota, and a quota denial does not unwind the
//! committed transition. It is reported to the caller as a partial success
//! instead.

use parking_lot::Mutex;
use std::sync::Arc;

use super::roster::{AddOutcome, FriendRoster};
use super::{Friend, FriendRequest, RequestStatus};
use crate::auth::UserProfile;
use crate::error::{Error, Result};
use crate::time::Clock;

/// Result of accepting a friend request.
///
/// The request transition itself has committed in every variant; the
/// variants describe what happened to the roster afterwards.
#[derive(Debug)]
pub enum AcceptOutcome {
    /// The counterpart entered the roster.
    Added(Friend),
    /// The counterpart was already in the roster.
    AlreadyFriend,
    /// The roster declined the counterpart. The request stays accepted.
    FriendNotAdded(Error),
}

/// What a request reconciliation pass observed.
#[derive(Debug, Default)]
pub struct RequestSync {
    /// Pending requests seen for the first time.
    pub received: Vec<FriendRequest>,
    /// Local pending requests the remote store settled.
    pub resolved: Vec<FriendRequest>,
}

/// The device-local book of friend requests.
pub struct RequestBook {
    /// Timestamp source for new requests
    clock: Arc<dyn Clock>,
    /// All requests this session knows about
    requests: Mutex<Vec<FriendRequest>>,
}

impl RequestBook {
    /// Create an empty request book.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a new pending request from `from` to the given recipient.
    ///
    /// No quota check runs here; the recipient's quota applies when the
    /// request is accepted.
    pub fn send(
        &self,
        from: &UserProfile,
        to_user_id: &str,
        to_user_name: &str,
        message: Option<String>,
    ) -> Result<FriendRequest> {
        let request = FriendRequest::new(from, to_user_id, to_user_name, message, self.clock.now())?;

        self.requests.lock().push(request.clone());

        tracing::info!("Created friend request {} to {}", request.id, to_user_id);
        Ok(request)
    }

    /// Accept a pending request and promote the counterpart into `roster`.
    ///
    /// The transition commits first. If the roster then declines the
    /// counterpart the outcome reports it distinctly; the request does not
    /// revert.
    pub fn accept(
        &self,
        request_id: &str,
        local_user_id: &str,
        roster: &FriendRoster,
        is_premium: bool,
    ) -> Result<AcceptOutcome> {
        let request = self.transition(request_id, RequestStatus::Accepted)?;

        let Some(counterpart) = request.counterpart_of(local_user_id) else {
            return Ok(AcceptOutcome::FriendNotAdded(Error::InvalidFriendData(
                format!("request {} does not involve user {}", request_id, local_user_id),
            )));
        };

        match roster.add_friend(counterpart, is_premium) {
            Ok(AddOutcome::Added(friend)) => Ok(AcceptOutcome::Added(friend)),
            Ok(AddOutcome::AlreadyFriend) => Ok(AcceptOutcome::AlreadyFriend),
            Err(err) => {
                tracing::warn!(
                    code = err.code(),
                    "Request {} accepted but friend was not added: {}",
                    request_id,
                    err
                );
                Ok(AcceptOutcome::FriendNotAdded(err))
            }
        }
    }

    /// Reject a pending request. No roster side effect.
    pub fn reject(&self, request_id: &str) -> Result<FriendRequest> {
        self.transition(request_id, RequestStatus::Rejected)
    }

    /// All pending requests addressed to or sent by `user_id`.
    pub fn list_pending(&self, user_id: &str) -> Vec<FriendRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.is_pending() && r.involves(user_id))
            .cloned()
            .collect()
    }

    /// How many pending requests are addressed to `user_id`.
    pub fn pending_incoming_count(&self, user_id: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.is_pending() && r.to_user_id == user_id)
            .count()
    }

    /// Get a request by id.
    pub fn get(&self, request_id: &str) -> Option<FriendRequest> {
        self.requests
            .lock()
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
    }

    /// Converge the book toward the remote store's request list.
    ///
    /// Status moves forward only: a locally settled request never reverts
    /// to pending and never flips terminal states, whatever the remote copy
    /// says. Local pending requests missing from the remote list are kept;
    /// their outcome is unknown, not rejected.
    pub fn sync_from_remote(&self, remote: Vec<FriendRequest>) -> RequestSync {
        let mut requests = self.requests.lock();
        let mut report = RequestSync::default();

        for incoming in remote {
            match requests.iter_mut().find(|r| r.id == incoming.id) {
                None => {
                    if incoming.is_pending() {
                        report.received.push(incoming.clone());
                    }
                    requests.push(incoming);
                }
                Some(local) if local.status.is_terminal() => {
                    // Already settled here; the local decision stands.
                }
                Some(local) => {
                    let settled = incoming.status.is_terminal();
                    *local = incoming;
                    if settled {
                        report.resolved.push(local.clone());
                    }
                }
            }
        }

        if !report.received.is_empty() || !report.resolved.is_empty() {
            tracing::info!(
                "Request sync: {} received, {} resolved",
                report.received.len(),
                report.resolved.len()
            );
        }
        report
    }

    /// Move a pending request to a terminal status.
    fn transition(&self, request_id: &str, to: RequestStatus) -> Result<FriendRequest> {
        let mut requests = self.requests.lock();
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| Error::RequestNotFound(request_id.to_string()))?;

        if request.status.is_terminal() {
            return Err(Error::InvalidRequestState {
                id: request_id.to_string(),
                status: request.status.as_str().to_string(),
            });
        }

        request.status = to;
        tracing::info!("Request {} is now {}", request_id, to.as_str());
        Ok(request.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
