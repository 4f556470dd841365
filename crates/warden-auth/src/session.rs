//! Session registry: at most one live session per user.
//!
//! A session is keyed by the SHA-256 of the access token it was opened
//! with. Expiry is detected lazily on [`SessionRegistry::validate`] and
//! expired rows are reclaimed by [`SessionRegistry::sweep_expired`].

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use warden_core::clock::Clock;
use warden_core::models::session::{CreateSession, Session};
use warden_core::repository::SessionRepository;

use crate::error::AuthError;
use crate::token;

/// Longest user agent stored on a session, in characters.
pub const MAX_USER_AGENT_CHARS: usize = 255;

/// Client details recorded on a new session.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

fn truncate_user_agent(ua: &str) -> String {
    ua.chars().take(MAX_USER_AGENT_CHARS).collect()
}

#[derive(Debug)]
pub struct SessionRegistry<S: SessionRepository> {
    sessions: S,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S: SessionRepository> SessionRegistry<S> {
    pub fn new(sessions: S, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions,
            clock,
            ttl,
        }
    }

    pub(crate) fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    /// Open a session for `access_token`, closing every other active
    /// session of the user in the same transaction.
    pub async fn create(
        &self,
        user_id: Uuid,
        access_token: &str,
        client: &ClientMeta,
    ) -> Result<Session, AuthError> {
        let now = self.clock.now();
        let session = self
            .sessions
            .create_exclusive(CreateSession {
                user_id,
                token_hash: token::hash_secret(access_token),
                user_agent: client.user_agent.as_deref().map(truncate_user_agent),
                ip_address: client.ip_address.clone(),
                created_at: now,
                expires_at: now + self.ttl,
            })
            .await?;

        info!(
            user_id = %user_id,
            session_id = %session.id,
            ip = client.ip_address.as_deref().unwrap_or("-"),
            "Session opened"
        );
        Ok(session)
    }

    /// `true` iff the token maps to an active, unexpired session. A live
    /// session has its activity timestamp bumped; an expired one is
    /// deactivated.
    pub async fn validate(&self, access_token: &str) -> Result<bool, AuthError> {
        let hash = token::hash_secret(access_token);
        let session = match self.sessions.get_active_by_token_hash(&hash).await {
            Ok(session) => session,
            Err(e) if e.is_not_found() => {
                debug!(token = %token::fingerprint(access_token), "No active session for token");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let now = self.clock.now();
        if now >= session.expires_at {
            self.sessions.deactivate(session.id).await?;
            info!(user_id = %session.user_id, session_id = %session.id, "Session expired");
            return Ok(false);
        }

        self.sessions.touch(session.id, now).await?;
        Ok(true)
    }

    /// Deactivate the session opened with `access_token`. Closing an
    /// unknown or already closed session is not an error.
    pub async fn close(&self, access_token: &str) -> Result<(), AuthError> {
        let closed = self
            .sessions
            .deactivate_by_token_hash(&token::hash_secret(access_token))
            .await?;
        debug!(token = %token::fingerprint(access_token), closed, "Session close requested");
        Ok(())
    }

    /// Deactivate every active session of `user_id`.
    pub async fn close_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let closed = self.sessions.deactivate_user_sessions(user_id).await?;
        info!(user_id = %user_id, closed, "Closed all sessions");
        Ok(closed)
    }

    /// Delete every session past its expiry.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_expired(self.clock.now()).await?;
        if removed > 0 {
            info!(removed, "Swept expired sessions");
        }
        Ok(removed)
    }

    /// Active sessions of `user_id`, most recent activity first.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<Session>, AuthError> {
        Ok(self.sessions.list_active(user_id).await?)
    }

    pub async fn has_active_session(&self, user_id: Uuid) -> Result<bool, AuthError> {
        Ok(!self.sessions.list_active(user_id).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_user_agent_is_kept() {
        assert_eq!(truncate_user_agent("curl/8.0"), "curl/8.0");
    }

    #[test]
    fn long_user_agent_is_truncated() {
        let ua = "x".repeat(400);
        assert_eq!(truncate_user_agent(&ua).len(), MAX_USER_AGENT_CHARS);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let ua = "é".repeat(300);
        let truncated = truncate_user_agent(&ua);
        assert_eq!(truncated.chars().count(), MAX_USER_AGENT_CHARS);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
