//! # Database Schema
//!
//! SQL schema definitions for the local snapshot database.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Snapshots table
-- Each row holds one serialized collection under a named key. The friend
-- roster lives under a single key; date fields inside the serialized value
-- are RFC 3339 strings.
CREATE TABLE IF NOT EXISTS snapshots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    -- When this snapshot was last written (RFC 3339)
    updated_at TEXT NOT NULL
);
"#;
