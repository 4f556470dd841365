//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Time-dependent operations take
//! the caller's notion of "now" explicitly so that storage never reads a
//! clock of its own.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WardenResult;
use crate::models::{
    grant::PendingGrant,
    session::{CreateSession, Session},
    tenant::{CreateTenant, Tenant, TenantStatus},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Tenants (read-only to the auth layer; `create` and `update_status` exist
// for provisioning and tests)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = WardenResult<Tenant>> + Send;
    fn update_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> impl Future<Output = WardenResult<Tenant>> + Send;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = WardenResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = WardenResult<User>> + Send;
    fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// Store `grant` as the user's only outstanding grant, replacing any
    /// previous one.
    fn set_pending_grant(
        &self,
        id: Uuid,
        grant: PendingGrant,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// Clear the pending grant, but only if it still carries
    /// `expected_hash`. Returns `false` when the grant was already consumed
    /// or replaced.
    fn clear_pending_grant(
        &self,
        id: Uuid,
        expected_hash: &str,
    ) -> impl Future<Output = WardenResult<bool>> + Send;

    fn get_by_grant_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = WardenResult<User>> + Send;

    /// Write a new password hash and clear the pending grant in one
    /// conditional statement. Returns `false` if the grant no longer
    /// carries `expected_hash`, in which case nothing is written.
    fn commit_password_reset(
        &self,
        id: Uuid,
        expected_hash: &str,
        password_hash: &str,
    ) -> impl Future<Output = WardenResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    /// Deactivate every active session of `input.user_id` and insert the
    /// new active session as one atomic unit.
    fn create_exclusive(
        &self,
        input: CreateSession,
    ) -> impl Future<Output = WardenResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WardenResult<Session>> + Send;
    fn get_active_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = WardenResult<Session>> + Send;
    /// Record activity on a session.
    fn touch(&self, id: Uuid, at: DateTime<Utc>) -> impl Future<Output = WardenResult<()>> + Send;
    fn deactivate(&self, id: Uuid) -> impl Future<Output = WardenResult<()>> + Send;
    /// Deactivate the session with this token hash, if any. Returns the
    /// number of rows that flipped from active to inactive.
    fn deactivate_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = WardenResult<u64>> + Send;
    /// Deactivate all active sessions for a user.
    fn deactivate_user_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WardenResult<u64>> + Send;
    /// Active sessions for a user, most recent activity first.
    fn list_active(&self, user_id: Uuid) -> impl Future<Output = WardenResult<Vec<Session>>> + Send;
    /// Delete every session whose expiry is before `now`.
    fn delete_expired(&self, now: DateTime<Utc>) -> impl Future<Output = WardenResult<u64>> + Send;
}
