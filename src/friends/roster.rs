//! # Friend Roster
//!
//! The canonical in-memory friend collection for the current session.
//!
//! The roster is the single owner of the list: every mutation goes through
//! it, checks run and apply under one lock, and each change is written
//! through to the snapshot store before the lock is released. Holding the
//! lock across the write keeps snapshots in mutation order; a snapshot can
//! never be older than one already written.
//!
//! Snapshot failures are logged and swallowed. The in-memory state already
//! reflects the caller's intent, so persistence trouble never turns a
//! completed operation into an error.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Friend, NewFriend};
use crate::error::{Error, Result};
use crate::quota::QuotaPolicy;
use crate::storage::SnapshotStore;
use crate::time::Clock;

/// Result of a [`FriendRoster::add_friend`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The candidate entered the roster.
    Added(Friend),
    /// The candidate was already present. Nothing changed.
    AlreadyFriend,
}

/// What a reconciliation pass changed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncDiff {
    /// Entries added locally.
    pub added: usize,
    /// Entries removed locally.
    pub removed: usize,
    /// Entries whose remote-owned fields changed.
    pub updated: usize,
}

impl SyncDiff {
    /// Whether the pass changed anything.
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

/// The device-local registry of confirmed friends.
pub struct FriendRoster {
    /// Write-through persistence for the collection
    store: Arc<dyn SnapshotStore>,
    /// Friend-count policy
    quota: QuotaPolicy,
    /// Timestamp source for mutations
    clock: Arc<dyn Clock>,
    /// The canonical collection, in insertion order
    friends: Mutex<Vec<Friend>>,
}

impl FriendRoster {
    /// Create an empty roster with its injected collaborators.
    pub fn new(store: Arc<dyn SnapshotStore>, quota: QuotaPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            quota,
            clock,
            friends: Mutex::new(Vec::new()),
        }
    }

    /// Replace the in-memory collection with the last saved snapshot.
    ///
    /// Returns how many entries were restored.
    pub fn load(&self) -> usize {
        let restored = self.store.load();
        let count = restored.len();
        *self.friends.lock() = restored;

        tracing::info!("Loaded {} friends from snapshot", count);
        count
    }

    /// Add a candidate to the roster.
    ///
    /// Adding someone already present succeeds without changing anything.
    /// A malformed candidate fails with `InvalidFriendData` and a full
    /// free-tier roster fails with `QuotaExceeded`; neither failure mutates
    /// state.
    pub fn add_friend(&self, candidate: NewFriend, is_premium: bool) -> Result<AddOutcome> {
        candidate.validate()?;

        let mut friends = self.friends.lock();

        if friends.iter().any(|f| f.id == candidate.id) {
            tracing::debug!("{} is already a friend", candidate.id);
            return Ok(AddOutcome::AlreadyFriend);
        }

        if !self.quota.can_add(friends.len(), is_premium) {
            return Err(Error::QuotaExceeded {
                limit: self.quota.free_limit,
            });
        }

        let friend = candidate.into_friend(self.clock.now());
        friends.push(friend.clone());
        self.persist_locked(&friends);

        tracing::info!("Added friend {}", friend.id);
        Ok(AddOutcome::Added(friend))
    }

    /// Remove the friend with the given id.
    ///
    /// Returns whether an entry was removed. Removing an unknown id is a
    /// no-op, not an error.
    pub fn remove_friend(&self, id: &str) -> bool {
        let mut friends = self.friends.lock();
        let before = friends.len();
        friends.retain(|f| f.id != id);

        if friends.len() == before {
            return false;
        }

        self.persist_locked(&friends);
        tracing::info!("Removed friend {}", id);
        true
    }

    /// Apply a presence transition observed at `at`.
    ///
    /// Returns whether a roster entry was updated. Unknown ids are ignored;
    /// a presence update never creates a friend.
    pub fn update_status(&self, id: &str, is_online: bool, at: DateTime<Utc>) -> bool {
        let mut friends = self.friends.lock();
        let Some(friend) = friends.iter_mut().find(|f| f.id == id) else {
            tracing::debug!("Presence update for unknown friend {}", id);
            return false;
        };

        friend.apply_presence(is_online, at);
        self.persist_locked(&friends);

        tracing::debug!("Friend {} is now {}", id, if is_online { "online" } else { "offline" });
        true
    }

    /// Flip the favorite flag on a friend.
    ///
    /// Returns the new flag value.
    pub fn toggle_favorite(&self, id: &str) -> Result<bool> {
        let mut friends = self.friends.lock();
        let friend = friends
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::FriendNotFound(id.to_string()))?;

        friend.is_favorite = !friend.is_favorite;
        let flag = friend.is_favorite;
        self.persist_locked(&friends);

        Ok(flag)
    }

    /// Set or clear the user-local nickname on a friend.
    ///
    /// An empty or whitespace-only nickname clears the override.
    pub fn set_nickname(&self, id: &str, nickname: Option<String>) -> Result<()> {
        let mut friends = self.friends.lock();
        let friend = friends
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::FriendNotFound(id.to_string()))?;

        friend.nickname = nickname.filter(|n| !n.trim().is_empty());
        self.persist_locked(&friends);

        Ok(())
    }

    /// Get a friend by id.
    pub fn get_by_id(&self, id: &str) -> Option<Friend> {
        self.friends.lock().iter().find(|f| f.id == id).cloned()
    }

    /// Get the collection in insertion order.
    pub fn list(&self) -> Vec<Friend> {
        self.friends.lock().clone()
    }

    /// Number of friends in the roster.
    pub fn len(&self) -> usize {
        self.friends.lock().len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.friends.lock().is_empty()
    }

    /// Whether the quota allows one more friend at the given tier.
    pub fn can_add_more(&self, is_premium: bool) -> bool {
        self.quota.can_add(self.friends.lock().len(), is_premium)
    }

    /// The configured free-tier limit.
    pub fn free_limit(&self) -> usize {
        self.quota.free_limit
    }

    /// Converge the collection toward an authoritative remote list.
    ///
    /// The remote list wins on membership, ordering, and remote-owned
    /// fields. User-local annotations (favorite flag, nickname) survive for
    /// entries that remain. No quota check runs here; the remote store has
    /// already admitted these friendships.
    pub fn sync_from_remote(&self, remote: Vec<Friend>) -> SyncDiff {
        let mut friends = self.friends.lock();
        let local_by_id: HashMap<String, Friend> =
            friends.iter().map(|f| (f.id.clone(), f.clone())).collect();

        let mut merged: Vec<Friend> = Vec::with_capacity(remote.len());
        let mut diff = SyncDiff::default();

        for mut entry in remote {
            if merged.iter().any(|f: &Friend| f.id == entry.id) {
                continue;
            }
            match local_by_id.get(&entry.id) {
                Some(local) => {
                    entry.is_favorite = local.is_favorite;
                    entry.nickname = local.nickname.clone();
                    if entry != *local {
                        diff.updated += 1;
                    }
                }
                None => diff.added += 1,
            }
            merged.push(entry);
        }

        diff.removed = friends
            .iter()
            .filter(|f| !merged.iter().any(|m| m.id == f.id))
            .count();

        if diff.is_empty() {
            return diff;
        }

        *friends = merged;
        self.persist_locked(&friends);

        tracing::info!(
            "Roster converged to remote: {} added, {} removed, {} updated",
            diff.added,
            diff.removed,
            diff.updated
        );
        diff
    }

    /// Write the collection through to the snapshot store.
    ///
    /// Called with the roster lock held, so writes land in mutation order.
    fn persist_locked(&self, friends: &[Friend]) {
        if let Err(err) = self.store.save(friends) {
            tracing::warn!(
                code = err.code(),
                "Snapshot write failed; keeping in-memory state: {}",
                err
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
