//! Schema definitions and migration runner for SurrealDB.
//!
//! Tables are SCHEMAFULL. UUIDs are stored as strings and enums as
//! strings guarded by ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration bookkeeping
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "tenants_users_sessions",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Active', 'Trial', 'Suspended', 'Expired'];
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;

-- =======================================================================
-- Users (tenant_id is NONE for super-admins)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string;
DEFINE FIELD tenant_id ON TABLE user TYPE option<string>;
DEFINE FIELD is_active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD grant_purpose ON TABLE user TYPE option<string>;
DEFINE FIELD grant_hash ON TABLE user TYPE option<string>;
DEFINE FIELD grant_expires_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_tenant ON TABLE user COLUMNS tenant_id;
DEFINE INDEX idx_user_grant_hash ON TABLE user COLUMNS grant_hash;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD is_active ON TABLE session TYPE bool DEFAULT true;
DEFINE FIELD last_activity_at ON TABLE session TYPE datetime;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token_hash ON TABLE session \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user_active ON TABLE session \
    COLUMNS user_id, is_active;
DEFINE INDEX idx_session_expires_at ON TABLE session COLUMNS expires_at;

-- One row per user, rewritten by every login. Two concurrent logins for
-- the same user both write this record and cannot both commit.
DEFINE TABLE session_slot SCHEMAFULL;
DEFINE FIELD session_id ON TABLE session_slot TYPE string;
DEFINE FIELD updated_at ON TABLE session_slot TYPE datetime;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Apply every migration newer than the recorded schema version and return
/// the version the database ends up at.
///
/// The `_migration` table is created on first run. Re-running against an
/// up-to-date database is a no-op.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let current = current_version(db).await?;
    debug!(current, "Current schema version");

    let mut version = current;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );

        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {e}",
                migration.version, migration.name
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {e}",
                    migration.version
                ))
            })?;
        version = migration.version;
    }

    Ok(version)
}

async fn current_version<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<AppliedMigration> = result.take(0)?;
    Ok(applied.first().map_or(0, |m| m.version))
}

/// Raw DDL for schema version 1, for in-memory test databases that skip
/// the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
