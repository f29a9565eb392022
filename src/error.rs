//! # Error Handling
//!
//! This module provides the error types for Kith Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                      │
//! │  │                                                                      │
//! │  ├── Session Errors                                                     │
//! │  │   └── NotAuthenticated      - No signed-in user available            │
//! │  │                                                                      │
//! │  ├── Friend Errors                                                      │
//! │  │   ├── InvalidFriendData     - Candidate missing id or name           │
//! │  │   └── FriendNotFound        - No roster entry with that id           │
//! │  │                                                                      │
//! │  ├── Quota Errors                                                       │
//! │  │   └── QuotaExceeded         - Free-tier friend limit reached         │
//! │  │                                                                      │
//! │  ├── Request Errors                                                     │
//! │  │   ├── InvalidRecipient      - Request addressed to an empty id       │
//! │  │   ├── RequestNotFound       - No request with that id                │
//! │  │   └── InvalidRequestState   - Transition on a settled request        │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                     │
//! │  │   ├── SnapshotWrite         - Failed to persist the snapshot         │
//! │  │   ├── SnapshotCorrupt       - Snapshot data failed to parse          │
//! │  │   └── DatabaseError         - Underlying SQLite failure              │
//! │  │                                                                      │
//! │  └── Remote Errors                                                      │
//! │      └── Remote                - Remote store call failed               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage write failures are logged and swallowed at the call site: the
//! in-memory state already reflects the caller's intent, so a snapshot
//! failure never aborts the logical operation that triggered it.

use thiserror::Error;

/// Result type alias for Kith Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Kith Core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Session Errors (100-199)
    // ========================================================================

    /// No signed-in user is available
    #[error("No signed-in user. The authentication provider returned no identity.")]
    NotAuthenticated,

    // ========================================================================
    // Friend Errors (200-299)
    // ========================================================================

    /// Friend candidate is missing required fields
    #[error("Invalid friend data: {0}")]
    InvalidFriendData(String),

    /// No friend with the given id exists in the roster
    #[error("Friend not found: {0}")]
    FriendNotFound(String),

    // ========================================================================
    // Quota Errors (300-399)
    // ========================================================================

    /// The free-tier friend limit has been reached
    #[error("Friend limit of {limit} reached. Upgrade to premium to add more friends.")]
    QuotaExceeded {
        /// The configured free-tier limit
        limit: usize,
    },

    // ========================================================================
    // Request Errors (400-499)
    // ========================================================================

    /// Friend request addressed to an empty recipient id
    #[error("Invalid recipient: friend requests need a non-empty recipient id.")]
    InvalidRecipient,

    /// Friend request not found
    #[error("Friend request not found: {0}")]
    RequestNotFound(String),

    /// Illegal transition on a request that already reached a terminal state
    #[error("Request {id} is already {status} and cannot change state.")]
    InvalidRequestState {
        /// The request id
        id: String,
        /// The terminal status the request already holds
        status: String,
    },

    // ========================================================================
    // Storage Errors (500-599)
    // ========================================================================

    /// Failed to write the local snapshot
    #[error("Failed to write snapshot: {0}")]
    SnapshotWrite(String),

    /// Snapshot data failed to parse
    #[error("Snapshot data corrupt: {0}")]
    SnapshotCorrupt(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ========================================================================
    // Remote Errors (600-699)
    // ========================================================================

    /// A remote relationship-store call failed
    #[error("Remote store call failed: {0}")]
    Remote(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Session
    /// - 200-299: Friends
    /// - 300-399: Quota
    /// - 400-499: Requests
    /// - 500-599: Storage
    /// - 600-699: Remote
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Session (100-199)
            Error::NotAuthenticated => 100,

            // Friends (200-299)
            Error::InvalidFriendData(_) => 200,
            Error::FriendNotFound(_) => 201,

            // Quota (300-399)
            Error::QuotaExceeded { .. } => 300,

            // Requests (400-499)
            Error::InvalidRecipient => 400,
            Error::RequestNotFound(_) => 401,
            Error::InvalidRequestState { .. } => 402,

            // Storage (500-599)
            Error::SnapshotWrite(_) => 500,
            Error::SnapshotCorrupt(_) => 501,
            Error::DatabaseError(_) => 502,

            // Remote (600-699)
            Error::Remote(_) => 600,

            // Internal (900-999)
            Error::SerializationError(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or by user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Remote(_) | Error::SnapshotWrite(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotAuthenticated.code(), 100);
        assert_eq!(Error::InvalidFriendData("test".into()).code(), 200);
        assert_eq!(Error::QuotaExceeded { limit: 3 }.code(), 300);
        assert_eq!(Error::InvalidRecipient.code(), 400);
        assert_eq!(Error::SnapshotWrite("test".into()).code(), 500);
        assert_eq!(Error::Remote("test".into()).code(), 600);
        assert_eq!(Error::SerializationError("test".into()).code(), 900);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Remote("offline".into()).is_recoverable());
        assert!(Error::SnapshotWrite("disk full".into()).is_recoverable());
        assert!(!Error::QuotaExceeded { limit: 3 }.is_recoverable());
        assert!(!Error::InvalidRecipient.is_recoverable());
    }

    #[test]
    fn test_quota_message_names_limit() {
        let err = Error::QuotaExceeded { limit: 3 };
        assert!(err.to_string().contains('3'));
    }
}
