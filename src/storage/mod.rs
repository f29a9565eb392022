//! # Storage Module
//!
//! The durable local snapshot of the friend roster.
//!
//! The roster owns the in-memory collection; a [`SnapshotStore`] holds a
//! serialized copy so the list survives process restarts. The store is
//! written through after every mutation and read exactly once, at startup.
//! It never originates mutations of its own.
//!
//! Loading is fail-open: a record that does not parse is dropped on its own
//! and a snapshot that does not parse at all yields an empty collection.
//! Startup always succeeds; at worst the roster begins empty and converges
//! from the remote store.

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::friends::Friend;

mod schema;
mod sqlite;

pub use sqlite::SqliteSnapshotStore;

/// Durable store for the serialized friend collection.
pub trait SnapshotStore: Send + Sync {
    /// Persist the collection, replacing any previous snapshot.
    fn save(&self, friends: &[Friend]) -> Result<()>;

    /// Load the last saved collection.
    ///
    /// Never fails: unreadable snapshots yield an empty collection and
    /// unparsable records are dropped individually.
    fn load(&self) -> Vec<Friend>;
}

/// Serialize a collection to the snapshot layout.
pub(crate) fn encode_snapshot(friends: &[Friend]) -> Result<String> {
    Ok(serde_json::to_string(friends)?)
}

/// Decode a snapshot, dropping records that fail to parse.
pub(crate) fn decode_snapshot(raw: &str) -> Vec<Friend> {
    let records: Vec<Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(err) => {
            let err = Error::SnapshotCorrupt(err.to_string());
            tracing::warn!(code = err.code(), "Snapshot unreadable, starting empty: {}", err);
            return Vec::new();
        }
    };

    let mut friends = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<Friend>(record) {
            Ok(friend) => friends.push(friend),
            Err(err) => {
                let err = Error::SnapshotCorrupt(err.to_string());
                tracing::warn!(code = err.code(), "Dropping malformed snapshot record: {}", err);
            }
        }
    }
    friends
}

/// An in-memory snapshot store.
///
/// Holds the serialized collection under a single cell, mirroring how a
/// browser shell keeps it under one storage key. Used by tests and
/// ephemeral sessions that opt out of disk persistence.
#[derive(Default)]
pub struct MemorySnapshotStore {
    cell: Mutex<Option<String>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, friends: &[Friend]) -> Result<()> {
        let encoded = encode_snapshot(friends)?;
        *self.cell.lock() = Some(encoded);
        Ok(())
    }

    fn load(&self) -> Vec<Friend> {
        match self.cell.lock().as_deref() {
            Some(raw) => decode_snapshot(raw),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friends::NewFriend;
    use chrono::{TimeZone, Utc};

    fn sample_friends() -> Vec<Friend> {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut offline = NewFriend::new("u2", "Bela").into_friend(at);
        offline.apply_presence(false, at + chrono::Duration::seconds(40));

        let mut online = NewFriend::new("u3", "Chike").into_friend(at);
        online.apply_presence(true, at);

        vec![offline, online]
    }

    #[test]
    fn test_memory_roundtrip() {
        let store = MemorySnapshotStore::new();
        let friends = sample_friends();

        store.save(&friends).unwrap();
        assert_eq!(store.load(), friends);
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_record_dropped_individually() {
        let raw = r#"[
            {"id":"u2","name":"Bela","isOnline":false,
             "lastSeen":"2025-06-01T12:00:40Z","addedAt":"2025-06-01T12:00:00Z"},
            {"id":"u3","name":"Chike","isOnline":false,
             "lastSeen":"not-a-date","addedAt":"2025-06-01T12:00:00Z"}
        ]"#;

        let friends = decode_snapshot(raw);
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].id, "u2");
    }

    #[test]
    fn test_unreadable_snapshot_loads_empty() {
        assert!(decode_snapshot("{{{ not json").is_empty());
        assert!(decode_snapshot(r#"{"id":"not-an-array"}"#).is_empty());
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let store = MemorySnapshotStore::new();
        let friends = sample_friends();

        store.save(&friends).unwrap();
        let loaded = store.load();
        let ids: Vec<&str> = loaded.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["u2", "u3"]);
    }
}
