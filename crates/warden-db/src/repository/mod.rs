//! SurrealDB repository implementations.

mod session;
mod tenant;
mod user;

pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for `count() ... GROUP ALL` queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::InvalidRow(format!("invalid {field} UUID: {e}")))
}
