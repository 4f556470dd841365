//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::grant::PendingGrant;

/// The tenant a user is bound to, as seen from the user record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantRef {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique login identifier.
    pub email: String,
    pub name: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Role type name (e.g. `admin`, `operator`). Permission lookup is
    /// handled outside this crate.
    pub role: String,
    /// `None` marks a Super Admin.
    pub tenant: Option<TenantRef>,
    pub is_active: bool,
    /// Outstanding one-time grant (password reset or impersonation).
    #[serde(skip_serializing, default)]
    pub pending_grant: Option<PendingGrant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_super_admin(&self) -> bool {
        self.tenant.is_none()
    }

    pub fn tenant_slug(&self) -> Option<&str> {
        self.tenant.as_ref().map(|t| t.slug.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    /// Already-hashed password; storage never sees plaintext.
    pub password_hash: String,
    pub role: String,
    pub tenant_id: Option<Uuid>,
}

/// Externally owned fields that may be patched on a user.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}
