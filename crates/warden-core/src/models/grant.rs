//! One-time grant model.
//!
//! A user owns at most one outstanding grant. Password-reset links and
//! impersonation (magic-link) tokens share this slot, so issuing either
//! kind replaces whatever was pending before.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GrantPurpose {
    /// Self-service password reset, delivered by mail.
    PasswordReset,
    /// Super Admin impersonation, redeemed through a magic login.
    Impersonation,
}

impl fmt::Display for GrantPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantPurpose::PasswordReset => f.write_str("password_reset"),
            GrantPurpose::Impersonation => f.write_str("impersonation"),
        }
    }
}

/// The hashed secret currently outstanding for a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingGrant {
    pub purpose: GrantPurpose,
    /// SHA-256 hex digest of the raw secret.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingGrant {
    /// A grant is dead from its expiry instant onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
