//! SurrealDB implementation of [`SessionRepository`].

use std::fmt;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::session::{CreateSession, Session};
use warden_core::repository::SessionRepository;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

/// Deactivates the user's sessions and inserts the new one in a single
/// transaction. The `session_slot` upsert makes two concurrent logins for
/// the same user write the same record, so at most one of them commits.
const CREATE_EXCLUSIVE: &str = "\
BEGIN TRANSACTION;
UPSERT type::record('session_slot', $user_id) SET \
    session_id = $id, updated_at = $created_at;
UPDATE session SET is_active = false \
    WHERE user_id = $user_id AND is_active = true;
CREATE type::record('session', $id) SET \
    user_id = $user_id, token_hash = $token_hash, \
    user_agent = $user_agent, ip_address = $ip_address, \
    is_active = true, last_activity_at = $created_at, \
    expires_at = $expires_at, created_at = $created_at;
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    token_hash: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    is_active: bool,
    last_activity_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    user_agent: Option<String>,
    ip_address: Option<String>,
    is_active: bool,
    last_activity_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: Uuid) -> Result<Session, DbError> {
    Ok(Session {
        id,
        user_id: parse_uuid(&row.user_id, "user")?,
        token_hash: row.token_hash,
        user_agent: row.user_agent,
        ip_address: row.ip_address,
        is_active: row.is_active,
        last_activity_at: row.last_activity_at,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let id = parse_uuid(&self.record_id, "session")?;
        row_to_session(
            SessionRow {
                user_id: self.user_id,
                token_hash: self.token_hash,
                user_agent: self.user_agent,
                ip_address: self.ip_address,
                is_active: self.is_active,
                last_activity_at: self.last_activity_at,
                expires_at: self.expires_at,
                created_at: self.created_at,
            },
            id,
        )
    }
}

/// SurrealDB implementation of the session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run a bulk `UPDATE` and count the rows it touched.
    async fn count_updated(
        &self,
        query: &'static str,
        key: &'static str,
        value: String,
    ) -> Result<u64, DbError> {
        let mut result = self.db.query(query).bind((key, value)).await?;
        let rows: Vec<SessionRow> = result.take(0)?;
        Ok(rows.len() as u64)
    }
}

impl<C: Connection> fmt::Debug for SurrealSessionRepository<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrealSessionRepository").finish_non_exhaustive()
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create_exclusive(&self, input: CreateSession) -> WardenResult<Session> {
        let id = Uuid::new_v4();

        self.db
            .query(CREATE_EXCLUSIVE)
            .bind(("id", id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("user_agent", input.user_agent))
            .bind(("ip_address", input.ip_address))
            .bind(("created_at", input.created_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        debug!(session_id = %id, user_id = %input.user_id, "Session created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<Session> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('session', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row_to_session(row, id)?)
    }

    async fn get_active_by_token_hash(&self, token_hash: &str) -> WardenResult<Session> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash AND is_active = true",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "token".into(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn touch(&self, id: Uuid, at: DateTime<Utc>) -> WardenResult<()> {
        self.db
            .query("UPDATE type::record('session', $id) SET last_activity_at = $at")
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> WardenResult<()> {
        self.db
            .query("UPDATE type::record('session', $id) SET is_active = false")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    async fn deactivate_by_token_hash(&self, token_hash: &str) -> WardenResult<u64> {
        Ok(self
            .count_updated(
                "UPDATE session SET is_active = false \
                 WHERE token_hash = $token_hash AND is_active = true",
                "token_hash",
                token_hash.to_string(),
            )
            .await?)
    }

    async fn deactivate_user_sessions(&self, user_id: Uuid) -> WardenResult<u64> {
        Ok(self
            .count_updated(
                "UPDATE session SET is_active = false \
                 WHERE user_id = $user_id AND is_active = true",
                "user_id",
                user_id.to_string(),
            )
            .await?)
    }

    async fn list_active(&self, user_id: Uuid) -> WardenResult<Vec<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE user_id = $user_id AND is_active = true \
                 ORDER BY last_activity_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        let sessions = rows
            .into_iter()
            .map(|r| r.try_into_session())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> WardenResult<u64> {
        // Count first, then delete.
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM session WHERE expires_at < $now GROUP ALL")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map_or(0, |r| r.total);

        self.db
            .query("DELETE session WHERE expires_at < $now")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }
}
