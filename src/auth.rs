//! # Session Collaborators
//!
//! Seams for the two external services the social core consults but does not
//! own: the authentication provider (who is the current user) and the
//! premium-entitlement service (may this user exceed the free friend limit).
//!
//! The core holds no identity of its own. Every construction path requires an
//! [`AuthProvider`], and quota checks read the entitlement through an
//! [`EntitlementProvider`] at call time rather than caching a flag.

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user id, unique across the application.
    pub id: String,
    /// Display name shown to other users.
    pub name: String,
}

impl UserProfile {
    /// Convenience constructor.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Supplies the current user's stable identity.
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    fn current_user(&self) -> Option<UserProfile>;
}

/// Supplies the boolean premium entitlement for the current user.
pub trait EntitlementProvider: Send + Sync {
    /// Whether the current user holds a premium subscription.
    fn is_premium(&self) -> bool;
}

/// An auth provider pinned to one signed-in user.
///
/// Application shells that manage sign-in elsewhere hand the resolved profile
/// to the core through this.
#[derive(Debug, Clone)]
pub struct StaticAuth {
    profile: UserProfile,
}

impl StaticAuth {
    /// Create a provider reporting `profile` as signed in.
    pub fn new(profile: UserProfile) -> Self {
        Self { profile }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<UserProfile> {
        Some(self.profile.clone())
    }
}

/// An entitlement provider pinned to a fixed tier.
#[derive(Debug, Clone, Copy)]
pub struct StaticEntitlement {
    premium: bool,
}

impl StaticEntitlement {
    /// Free-tier entitlement.
    pub fn free() -> Self {
        Self { premium: false }
    }

    /// Premium entitlement.
    pub fn premium() -> Self {
        Self { premium: true }
    }
}

impl EntitlementProvider for StaticEntitlement {
    fn is_premium(&self) -> bool {
        self.premium
    }
}

// ============================================================================
// TESTS
// ============================================================================
