//! Error types shared by every Warden crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

impl WardenError {
    /// Shorthand for a missing row.
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        WardenError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WardenError::NotFound { .. })
    }
}

pub type WardenResult<T> = Result<T, WardenError>;
