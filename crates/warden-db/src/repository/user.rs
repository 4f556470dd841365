//! SurrealDB implementation of [`UserRepository`].
//!
//! The pending one-time grant lives on the user record as three optional
//! columns (`grant_purpose`, `grant_hash`, `grant_expires_at`) that are
//! always written and cleared together. Consuming a grant is a single
//! `UPDATE ... WHERE grant_hash = $hash`, so two concurrent consumers of
//! the same secret cannot both succeed.
//!
//! Emails are stored lowercased and looked up the same way.

use std::fmt;

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;
use warden_core::error::WardenResult;
use warden_core::models::grant::{GrantPurpose, PendingGrant};
use warden_core::models::user::{CreateUser, TenantRef, UpdateUser, User};
use warden_core::repository::UserRepository;

use super::parse_uuid;
use crate::error::DbError;

/// Row for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    name: String,
    password_hash: String,
    role: String,
    tenant_id: Option<String>,
    is_active: bool,
    grant_purpose: Option<String>,
    grant_hash: Option<String>,
    grant_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row that carries the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    tenant_id: Option<String>,
    is_active: bool,
    grant_purpose: Option<String>,
    grant_hash: Option<String>,
    grant_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRowWithId {
    fn split(self) -> Result<(Uuid, UserRow), DbError> {
        let id = parse_uuid(&self.record_id, "user")?;
        let row = UserRow {
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            role: self.role,
            tenant_id: self.tenant_id,
            is_active: self.is_active,
            grant_purpose: self.grant_purpose,
            grant_hash: self.grant_hash,
            grant_expires_at: self.grant_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        Ok((id, row))
    }
}

/// Projection of the owning tenant used to hydrate [`TenantRef`].
#[derive(Debug, SurrealValue)]
struct TenantRefRow {
    name: String,
    slug: String,
}

/// Result row of conditional updates; only presence matters.
#[derive(Debug, SurrealValue)]
struct TouchedRow {
    email: String,
}

fn parse_purpose(s: &str) -> Result<GrantPurpose, DbError> {
    match s {
        "PasswordReset" => Ok(GrantPurpose::PasswordReset),
        "Impersonation" => Ok(GrantPurpose::Impersonation),
        other => Err(DbError::InvalidRow(format!("unknown grant purpose: {other}"))),
    }
}

fn purpose_to_string(purpose: GrantPurpose) -> &'static str {
    match purpose {
        GrantPurpose::PasswordReset => "PasswordReset",
        GrantPurpose::Impersonation => "Impersonation",
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserRow {
    fn pending_grant(&mut self) -> Result<Option<PendingGrant>, DbError> {
        match (
            self.grant_purpose.take(),
            self.grant_hash.take(),
            self.grant_expires_at.take(),
        ) {
            (Some(purpose), Some(token_hash), Some(expires_at)) => Ok(Some(PendingGrant {
                purpose: parse_purpose(&purpose)?,
                token_hash,
                expires_at,
            })),
            (None, None, None) => Ok(None),
            _ => Err(DbError::InvalidRow("partially written pending grant".into())),
        }
    }

    fn into_user(mut self, id: Uuid, tenant: Option<TenantRef>) -> Result<User, DbError> {
        let pending_grant = self.pending_grant()?;
        Ok(User {
            id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            role: self.role,
            tenant,
            is_active: self.is_active,
            pending_grant,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the user repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn load_tenant(&self, tenant_id: Option<&str>) -> Result<Option<TenantRef>, DbError> {
        let Some(tenant_id) = tenant_id else {
            return Ok(None);
        };

        let mut result = self
            .db
            .query("SELECT name, slug FROM type::record('tenant', $id)")
            .bind(("id", tenant_id.to_string()))
            .await?;

        let rows: Vec<TenantRefRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tenant".into(),
            id: tenant_id.to_string(),
        })?;

        Ok(Some(TenantRef {
            id: parse_uuid(tenant_id, "tenant")?,
            slug: row.slug,
            name: row.name,
        }))
    }

    async fn hydrate(&self, id: Uuid, row: UserRow) -> Result<User, DbError> {
        let tenant = self.load_tenant(row.tenant_id.as_deref()).await?;
        row.into_user(id, tenant)
    }

    async fn find_one(
        &self,
        filter: &'static str,
        value: String,
        not_found_id: String,
    ) -> Result<User, DbError> {
        let query = format!("SELECT meta::id(id) AS record_id, * FROM user WHERE {filter} = $value");
        let mut result = self.db.query(query).bind(("value", value)).await?;

        let rows: Vec<UserRowWithId> = result.take(0)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "user".into(),
            id: not_found_id,
        })?;

        let (id, row) = row.split()?;
        self.hydrate(id, row).await
    }
}

impl<C: Connection> fmt::Debug for SurrealUserRepository<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurrealUserRepository").finish_non_exhaustive()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WardenResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, name = $name, \
                 password_hash = $password_hash, role = $role, \
                 tenant_id = $tenant_id, is_active = true",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", normalize_email(&input.email)))
            .bind(("name", input.name))
            .bind(("password_hash", input.password_hash))
            .bind(("role", input.role))
            .bind(("tenant_id", input.tenant_id.map(|t| t.to_string())))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(self.hydrate(id, row).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(self.hydrate(id, row).await?)
    }

    async fn get_by_email(&self, email: &str) -> WardenResult<User> {
        let email = normalize_email(email);
        Ok(self.find_one("email", email.clone(), email).await?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> WardenResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('user', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(self.hydrate(id, row).await?)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> WardenResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("password_hash", password_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            }
            .into());
        }
        Ok(())
    }

    async fn set_pending_grant(&self, id: Uuid, grant: PendingGrant) -> WardenResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 grant_purpose = $purpose, grant_hash = $hash, \
                 grant_expires_at = $expires_at, updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("purpose", purpose_to_string(grant.purpose)))
            .bind(("hash", grant.token_hash))
            .bind(("expires_at", grant.expires_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            }
            .into());
        }

        debug!(user_id = %id, purpose = %grant.purpose, "Stored pending grant");
        Ok(())
    }

    async fn clear_pending_grant(&self, id: Uuid, expected_hash: &str) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 grant_purpose = NONE, grant_hash = NONE, \
                 grant_expires_at = NONE, updated_at = time::now() \
                 WHERE grant_hash = $hash",
            )
            .bind(("id", id.to_string()))
            .bind(("hash", expected_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn get_by_grant_hash(&self, token_hash: &str) -> WardenResult<User> {
        Ok(self
            .find_one("grant_hash", token_hash.to_string(), "grant".into())
            .await?)
    }

    async fn commit_password_reset(
        &self,
        id: Uuid,
        expected_hash: &str,
        password_hash: &str,
    ) -> WardenResult<bool> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, \
                 grant_purpose = NONE, grant_hash = NONE, \
                 grant_expires_at = NONE, updated_at = time::now() \
                 WHERE grant_hash = $hash",
            )
            .bind(("id", id.to_string()))
            .bind(("hash", expected_hash.to_string()))
            .bind(("password_hash", password_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TouchedRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}
