//! Access token signing and verification (EdDSA / Ed25519 JWTs).

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::models::user::User;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Absent for super-admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_slug: Option<String>,
    /// Set when the token was obtained through an impersonation grant.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub impersonated: bool,
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

/// Produces and checks bearer strings.
pub trait AccessTokenSigner: Send + Sync + fmt::Debug {
    /// Sign an access token for `user`, carrying its tenant binding.
    fn sign(&self, user: &User, impersonated: bool) -> Result<String, AuthError>;

    /// Check signature, issuer and expiry, returning the claims.
    fn verify(&self, token: &str) -> Result<AccessTokenClaims, AuthError>;
}

/// [`AccessTokenSigner`] backed by an Ed25519 key pair.
pub struct JwtSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    lifetime_secs: i64,
}

impl JwtSigner {
    /// Parse the PEM key pair from `config`.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let encoding = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;
        let decoding = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;
        let lifetime_secs = config.access_token_lifetime()?.num_seconds();

        Ok(Self {
            encoding,
            decoding,
            issuer: config.jwt_issuer.clone(),
            lifetime_secs,
        })
    }

    fn encode(&self, claims: &AccessTokenClaims) -> Result<String, AuthError> {
        let header = Header::new(Algorithm::EdDSA);
        jsonwebtoken::encode(&header, claims, &self.encoding)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }
}

impl fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSigner")
            .field("issuer", &self.issuer)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl AccessTokenSigner for JwtSigner {
    fn sign(&self, user: &User, impersonated: bool) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            tenant_id: user.tenant.as_ref().map(|t| t.id.to_string()),
            tenant_slug: user.tenant.as_ref().map(|t| t.slug.clone()),
            impersonated,
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.lifetime_secs,
            jti: Uuid::new_v4().to_string(),
        };
        self.encode(&claims)
    }

    fn verify(&self, token: &str) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }
}
