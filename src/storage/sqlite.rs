//! # SQLite Snapshot Store
//!
//! Durable snapshot backing built on SQLite.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SNAPSHOT OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │  FriendRoster   │  write-through after each mutation                 │
//! │  └────────┬────────┘                                                    │
//! │           │ save([Friend]) / load()                                     │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │ SqliteSnapshot  │  serialize collection ⇄ one row per named key      │
//! │  │     Store       │                                                    │
//! │  └────────┬────────┘                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                    │
//! │  │   SQLite DB     │  - In-memory for tests                             │
//! │  │  (file or mem)  │  - File for production                             │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;

use super::{decode_snapshot, encode_snapshot, schema, SnapshotStore};
use crate::error::{Error, Result};
use crate::friends::Friend;

/// Key the friend roster is stored under.
const ROSTER_KEY: &str = "friends";

/// Snapshot store backed by a SQLite database.
pub struct SqliteSnapshotStore {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
    /// Which named snapshot this store reads and writes
    key: String,
}

impl SqliteSnapshotStore {
    /// Open or create a snapshot database.
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub fn open(path: Option<&str>) -> Result<Self> {
        Self::open_named(path, ROSTER_KEY)
    }

    /// Open a store bound to a custom snapshot key.
    pub fn open_named(path: Option<&str>, key: impl Into<String>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            key: key.into(),
        };

        store.init_schema()?;

        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Check current schema version
        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .ok();

        match version {
            None => {
                conn.execute_batch(schema::CREATE_TABLES)
                    .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?)",
                    params![schema::SCHEMA_VERSION],
                )?;

                tracing::info!(
                    "Snapshot schema created (version {})",
                    schema::SCHEMA_VERSION
                );
            }
            Some(v) => {
                tracing::debug!("Snapshot schema version: {}", v);
            }
        }

        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn save(&self, friends: &[Friend]) -> Result<()> {
        let encoded = encode_snapshot(friends)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, value, updated_at) VALUES (?, ?, ?)",
            params![self.key, encoded, crate::time::now().to_rfc3339()],
        )
        .map_err(|e| Error::SnapshotWrite(e.to_string()))?;

        tracing::debug!("Saved snapshot '{}' ({} friends)", self.key, friends.len());
        Ok(())
    }

    fn load(&self) -> Vec<Friend> {
        let conn = self.conn.lock();

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?",
                params![self.key],
                |row| row.get(0),
            )
            .ok();

        match raw {
            Some(raw) => decode_snapshot(&raw),
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
        let mut asha = NewFriend::new("u1", "Asha").into_friend(at);
        asha.apply_presence(false, at + chrono::Duration::seconds(10));
        let bela = NewFriend::new("u2", "Bela").into_friend(at);
        vec![asha, bela]
    }

    #[test]
    fn test_in_memory_roundtrip() {
        let store = SqliteSnapshotStore::open(None).unwrap();
        let friends = sample_friends();

        store.save(&friends).unwrap();
        assert_eq!(store.load(), friends);
    }

    #[test]
    fn test_missing_snapshot_loads_empty() {
        let store = SqliteSnapshotStore::open(None).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let store = SqliteSnapshotStore::open(None).unwrap();
        let friends = sample_friends();

        store.save(&friends).unwrap();
        store.save(&friends[..1]).unwrap();

        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_file_backed_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let path = path.to_str().unwrap();

        let friends = sample_friends();
        {
            let store = SqliteSnapshotStore::open(Some(path)).unwrap();
            store.save(&friends).unwrap();
        }

        let reopened = SqliteSnapshotStore::open(Some(path)).unwrap();
        assert_eq!(reopened.load(), friends);
    }

    #[test]
    fn test_corrupt_snapshot_value_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteSnapshotStore::open(Some(path)).unwrap();
            store.save(&sample_friends()).unwrap();
        }

        // Corrupt the stored value out-of-band.
        {
            let conn = Connection::open(path).unwrap();
            conn.execute(
                "UPDATE snapshots SET value = '{{{ not json' WHERE key = ?",
                params![ROSTER_KEY],
            )
            .unwrap();
        }

        let store = SqliteSnapshotStore::open(Some(path)).unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_named_snapshots_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.db");
        let path = path.to_str().unwrap();

        let main = SqliteSnapshotStore::open(Some(path)).unwrap();
        main.save(&sample_friends()).unwrap();

        let other = SqliteSnapshotStore::open_named(Some(path), "archived").unwrap();
        assert!(other.load().is_empty());
    }
}
