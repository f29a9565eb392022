//! # Kith Core
//!
//! The client-side social graph library for the Kith chat application:
//! friends, friend requests, presence, and the free/premium friend quota,
//! held locally and converged against a remote relationship store.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KITH CORE MODULES                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                        SocialClient                              │   │
//! │  │   session facade: optimistic mutations + remote confirmation     │   │
//! │  └───────┬──────────────────┬───────────────────┬───────────────────┘   │
//! │          │                  │                   │                       │
//! │          ▼                  ▼                   ▼                       │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐             │
//! │  │ FriendRoster│    │ RequestBook │    │  Synchronizer    │             │
//! │  │             │    │             │    │                  │             │
//! │  │ - add/remove│    │ - send      │    │ - realtime feed  │             │
//! │  │ - presence  │◄───│ - accept    │    │ - refresh pull   │             │
//! │  │ - quota     │    │ - reject    │    │ - remote wins    │             │
//! │  └──────┬──────┘    └─────────────┘    └────────┬─────────┘             │
//! │         │                                       │                       │
//! │         ▼                                       ▼                       │
//! │  ┌─────────────┐                       ┌──────────────────┐             │
//! │  │ SnapshotStore│  write-through       │   RemoteStore    │             │
//! │  │ (SQLite/mem) │  local durability    │  (collaborator)  │             │
//! │  └─────────────┘                       └──────────────────┘             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Rules
//!
//! - The roster is the single owner of the in-memory friend collection.
//!   Checks and mutations run atomically under its lock, and every change
//!   is written through to the snapshot store in mutation order.
//! - Remote input (presence, request notifications) reaches the roster
//!   through one receive loop, never concurrently from callbacks.
//! - The remote store is authoritative once it answers. Local mutations are
//!   optimistic; failures surface as "not confirmed" and reconciliation
//!   converges, it never rolls back.
//! - The quota policy is pure. Entitlement is read through an injected
//!   provider at call time, never from ambient state.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod friends;
pub mod quota;
pub mod remote;
pub mod storage;
/// Wall-clock utilities and the injectable clock seam.
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use auth::{AuthProvider, EntitlementProvider, StaticAuth, StaticEntitlement, UserProfile};
pub use client::{Confirmed, SocialClient};
pub use error::{Error, Result};
pub use events::SocialEvent;
pub use friends::{
    AcceptOutcome, AddOutcome, Friend, FriendRequest, FriendRoster, FriendsStats, NewFriend,
    PresenceEvent, PresenceTracker, RequestBook, RequestStatus, SyncDiff,
};
pub use quota::QuotaPolicy;
pub use remote::{LoopbackRemote, RemoteChange, RemoteStore, Synchronizer};
pub use storage::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for constructing a [`SocialClient`].
#[derive(Debug, Clone)]
pub struct SocialConfig {
    /// Maximum friends a free-tier account may hold.
    pub free_friend_limit: usize,
    /// Path of the snapshot database. `None` keeps snapshots in memory.
    pub snapshot_path: Option<String>,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            free_friend_limit: quota::DEFAULT_FREE_LIMIT,
            snapshot_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SocialConfig::default();
        assert_eq!(config.free_friend_limit, 3);
        assert!(config.snapshot_path.is_none());
    }
}
