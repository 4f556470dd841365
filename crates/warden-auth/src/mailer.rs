//! Outbound mail port.

use warden_core::error::WardenResult;
use warden_core::models::user::User;

/// Delivers password reset messages. Implementations own templating and
/// transport; a returned error is reported to the caller as a delivery
/// failure.
pub trait Mailer: Send + Sync {
    fn send_password_reset(
        &self,
        user: &User,
        secret: &str,
        tenant_slug: Option<&str>,
    ) -> impl Future<Output = WardenResult<()>> + Send;
}

/// Link a user follows to finish a password reset. Super-admins land on
/// the `admin` host.
pub fn password_reset_url(base_domain: &str, tenant_slug: Option<&str>, secret: &str) -> String {
    let host = tenant_slug.unwrap_or("admin");
    format!("https://{host}.{base_domain}/reset-password?token={secret}")
}
