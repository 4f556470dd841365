//! Authentication configuration.

use chrono::Duration;
use serde::Deserialize;

use crate::error::AuthError;

/// Configuration for the authentication service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 86 400 = 24 hours).
    pub access_token_lifetime_secs: u64,
    /// Session lifetime in seconds (default: 86 400 = 24 hours).
    pub session_lifetime_secs: u64,
    /// Password reset grant lifetime in seconds (default: 3 600 = 1 hour).
    pub password_reset_lifetime_secs: u64,
    /// Impersonation grant lifetime in seconds (default: 300 = 5 minutes).
    pub impersonation_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length accepted by password reset.
    pub min_password_length: usize,
    /// Apex domain tenants are served under, e.g. `example.com` for
    /// `acme.example.com`. Used in denial messages and reset links.
    pub base_domain: String,
    /// Close every session of a user after a successful password reset.
    pub revoke_sessions_on_password_reset: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "warden".into(),
            access_token_lifetime_secs: 86_400,
            session_lifetime_secs: 86_400,
            password_reset_lifetime_secs: 3_600,
            impersonation_lifetime_secs: 300,
            pepper: None,
            min_password_length: 12,
            base_domain: "localhost".into(),
            revoke_sessions_on_password_reset: true,
        }
    }
}

impl AuthConfig {
    pub fn access_token_lifetime(&self) -> Result<Duration, AuthError> {
        lifetime("access_token_lifetime_secs", self.access_token_lifetime_secs)
    }

    pub fn session_lifetime(&self) -> Result<Duration, AuthError> {
        lifetime("session_lifetime_secs", self.session_lifetime_secs)
    }

    pub fn password_reset_lifetime(&self) -> Result<Duration, AuthError> {
        lifetime("password_reset_lifetime_secs", self.password_reset_lifetime_secs)
    }

    pub fn impersonation_lifetime(&self) -> Result<Duration, AuthError> {
        lifetime("impersonation_lifetime_secs", self.impersonation_lifetime_secs)
    }
}

/// `secs` as a [`Duration`], or a config error when chrono cannot represent it.
fn lifetime(field: &'static str, secs: u64) -> Result<Duration, AuthError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AuthError::InvalidConfig(format!("{field} is out of range: {secs}")))
}
