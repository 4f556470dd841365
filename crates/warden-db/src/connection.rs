//! Opening a migrated Warden store.
//!
//! [`DbManager`] owns one SurrealDB handle, guarantees the schema is current
//! before anything else touches it, and hands out the repository adapters
//! that share that handle.

use std::fmt;

use serde::Deserialize;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;
use crate::repository::{
    SurrealSessionRepository, SurrealTenantRepository, SurrealUserRepository,
};
use crate::schema::run_migrations;

/// Where the Warden store lives. Read from the `[db]` table of the process
/// configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// WebSocket address of the SurrealDB server, e.g. `db.internal:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Leave both empty for a server started with
    /// `--unauthenticated`.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "warden".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    fn has_credentials(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }
}

/// A migrated SurrealDB handle plus the repositories built on it.
#[derive(Clone)]
pub struct DbManager<C: Connection = Client> {
    db: Surreal<C>,
    schema_version: u32,
}

impl DbManager<Client> {
    /// Connect to a SurrealDB server and bring its schema up to date.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening session store"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        if config.has_credentials() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }

        Self::prepare(db, config).await
    }
}

impl DbManager<Db> {
    /// A private in-memory store with the schema applied. Nothing survives
    /// the process.
    pub async fn in_memory(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            namespace = %config.namespace,
            database = %config.database,
            "Opening in-memory session store"
        );
        let db = Surreal::new::<Mem>(()).await?;
        Self::prepare(db, config).await
    }
}

impl<C: Connection> DbManager<C> {
    async fn prepare(db: Surreal<C>, config: &DbConfig) -> Result<Self, DbError> {
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        let schema_version = run_migrations(&db).await?;
        info!(schema_version, "Session store ready");

        Ok(Self { db, schema_version })
    }

    /// Schema version after migrations ran.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn client(&self) -> &Surreal<C> {
        &self.db
    }

    pub fn tenants(&self) -> SurrealTenantRepository<C> {
        SurrealTenantRepository::new(self.db.clone())
    }

    pub fn users(&self) -> SurrealUserRepository<C> {
        SurrealUserRepository::new(self.db.clone())
    }

    pub fn sessions(&self) -> SurrealSessionRepository<C> {
        SurrealSessionRepository::new(self.db.clone())
    }
}

impl<C: Connection> fmt::Debug for DbManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbManager")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}
