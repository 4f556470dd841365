//! One-time grants: password reset and impersonation secrets.
//!
//! A user holds at most one [`PendingGrant`]. Issuing a new grant replaces
//! whatever was outstanding. Only the SHA-256 of the secret is stored.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_core::clock::Clock;
use warden_core::models::grant::{GrantPurpose, PendingGrant};
use warden_core::models::user::User;
use warden_core::repository::UserRepository;

use crate::error::AuthError;
use crate::token;

#[derive(Debug)]
pub struct GrantManager<U: UserRepository> {
    users: U,
    clock: Arc<dyn Clock>,
}

impl<U: UserRepository> GrantManager<U> {
    pub fn new(users: U, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }

    pub(crate) fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Issue a fresh secret for `user_id`, valid for `ttl`. Returns the raw
    /// secret; it is not recoverable afterwards.
    pub async fn issue(
        &self,
        user_id: Uuid,
        purpose: GrantPurpose,
        ttl: Duration,
    ) -> Result<(String, PendingGrant), AuthError> {
        let secret = token::generate_opaque_secret();
        let grant = PendingGrant {
            purpose,
            token_hash: token::hash_secret(&secret),
            expires_at: self.clock.now() + ttl,
        };

        self.users.set_pending_grant(user_id, grant.clone()).await?;

        info!(
            user_id = %user_id,
            %purpose,
            grant = %token::fingerprint(&secret),
            expires_at = %grant.expires_at,
            "Issued one-time grant"
        );
        Ok((secret, grant))
    }

    /// Find the user holding `secret` for `purpose`.
    ///
    /// Unknown secrets and secrets issued for a different purpose are both
    /// reported as [`AuthError::TokenInvalidOrExpired`].
    pub async fn resolve(&self, secret: &str, purpose: GrantPurpose) -> Result<User, AuthError> {
        let user = match self.users.get_by_grant_hash(&token::hash_secret(secret)).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                debug!(grant = %token::fingerprint(secret), "Unknown one-time grant");
                return Err(AuthError::TokenInvalidOrExpired);
            }
            Err(e) => return Err(e.into()),
        };

        match &user.pending_grant {
            Some(grant) if grant.purpose == purpose => Ok(user),
            _ => {
                warn!(
                    user_id = %user.id,
                    expected = %purpose,
                    grant = %token::fingerprint(secret),
                    "One-time grant presented for the wrong purpose"
                );
                Err(AuthError::TokenInvalidOrExpired)
            }
        }
    }

    /// Reject a resolved grant whose expiry has passed.
    pub fn validate_not_expired(&self, user: &User) -> Result<(), AuthError> {
        let grant = user
            .pending_grant
            .as_ref()
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        if grant.is_expired_at(self.clock.now()) {
            debug!(user_id = %user.id, expired_at = %grant.expires_at, "One-time grant expired");
            return Err(AuthError::TokenInvalidOrExpired);
        }
        Ok(())
    }

    /// Clear the grant `user` was resolved with. Fails if a concurrent
    /// request consumed or replaced it first.
    pub async fn consume(&self, user: &User) -> Result<(), AuthError> {
        let grant = user
            .pending_grant
            .as_ref()
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        if !self.users.clear_pending_grant(user.id, &grant.token_hash).await? {
            warn!(user_id = %user.id, "One-time grant was already consumed");
            return Err(AuthError::TokenInvalidOrExpired);
        }

        debug!(user_id = %user.id, purpose = %grant.purpose, "Consumed one-time grant");
        Ok(())
    }

    /// Store `password_hash` and consume the reset grant in one write.
    pub async fn commit_password_reset(
        &self,
        user: &User,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let grant = user
            .pending_grant
            .as_ref()
            .ok_or(AuthError::TokenInvalidOrExpired)?;

        let committed = self
            .users
            .commit_password_reset(user.id, &grant.token_hash, password_hash)
            .await?;
        if !committed {
            warn!(user_id = %user.id, "Password reset grant was already consumed");
            return Err(AuthError::TokenInvalidOrExpired);
        }
        Ok(())
    }
}
