//! Opaque secret generation and one-way hashing.
//!
//! Secrets handed to users (one-time grants) and bearer strings tracked by
//! the session registry are stored only as their SHA-256 digest.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Generate a cryptographically random opaque secret
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_opaque_secret() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of `raw`, lowercase hex. This is the value persisted in
/// `user.grant_hash` and `session.token_hash`.
pub fn hash_secret(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short, non-reversible tag for log lines.
pub fn fingerprint(raw: &str) -> String {
    let mut hash = hash_secret(raw);
    hash.truncate(10);
    hash
}
