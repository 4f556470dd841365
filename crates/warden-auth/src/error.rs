//! Authentication error types.

use thiserror::Error;
use warden_core::error::WardenError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("tenant access denied: {reason}")]
    TenantAccessDenied { reason: String },

    /// Unknown, consumed, replaced or expired one-time secret. Callers
    /// cannot tell these apart.
    #[error("token is invalid or has expired")]
    TokenInvalidOrExpired,

    #[error("could not deliver message: {0}")]
    DeliveryFailure(String),

    #[error("not allowed: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("user not found")]
    UserNotFound,

    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("your session was closed because you signed in on another device")]
    SessionRevoked,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] WardenError),
}

impl From<AuthError> for WardenError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::TokenInvalidOrExpired
            | AuthError::SessionRevoked
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => WardenError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::TenantAccessDenied { reason } | AuthError::AuthorizationDenied { reason } => {
                WardenError::AuthorizationDenied { reason }
            }
            AuthError::DeliveryFailure(msg) => WardenError::Delivery(msg),
            AuthError::UserNotFound => WardenError::NotFound {
                entity: "user".into(),
                id: String::new(),
            },
            AuthError::WeakPassword { .. } | AuthError::InvalidConfig(_) => {
                WardenError::Validation {
                    message: err.to_string(),
                }
            }
            AuthError::Crypto(msg) => WardenError::Crypto(msg),
            AuthError::Storage(inner) => inner,
        }
    }
}
