//! Tenant access policy.
//!
//! Decides whether a user may obtain a token on the host the request came
//! in on. Tenant-bound users must use their tenant's subdomain;
//! super-admins must use the bare/admin domain. Nothing is written.

use tracing::{debug, warn};
use warden_core::models::tenant::TenantStatus;
use warden_core::models::user::User;
use warden_core::repository::TenantRepository;

use crate::error::AuthError;

#[derive(Debug)]
pub struct TenantAccessPolicy<T: TenantRepository> {
    tenants: T,
    base_domain: String,
}

impl<T: TenantRepository> TenantAccessPolicy<T> {
    pub fn new(tenants: T, base_domain: impl Into<String>) -> Self {
        Self {
            tenants,
            base_domain: base_domain.into(),
        }
    }

    /// Check `user` against the tenant context of the request.
    ///
    /// An empty slug is treated the same as no slug.
    pub async fn validate(&self, user: &User, requested: Option<&str>) -> Result<(), AuthError> {
        let requested = requested.filter(|s| !s.is_empty());

        let Some(slug) = requested else {
            return match user.tenant_slug() {
                None => Ok(()),
                Some(own) => self.deny(
                    user,
                    format!(
                        "this account belongs to tenant '{own}', sign in at {own}.{}",
                        self.base_domain
                    ),
                ),
            };
        };

        let Some(own) = user.tenant_slug() else {
            return self.deny(
                user,
                format!("super admin must sign in at admin.{}", self.base_domain),
            );
        };

        let tenant = match self.tenants.get_by_slug(slug).await {
            Ok(tenant) => tenant,
            Err(e) if e.is_not_found() => {
                return self.deny(user, format!("unknown tenant '{slug}'"));
            }
            Err(e) => return Err(e.into()),
        };

        match tenant.status {
            TenantStatus::Suspended => {
                return self.deny(user, format!("tenant '{slug}' is suspended"));
            }
            TenantStatus::Expired => {
                return self.deny(user, format!("subscription for tenant '{slug}' has expired"));
            }
            TenantStatus::Active | TenantStatus::Trial => {}
        }

        if own != slug {
            return self.deny(
                user,
                format!(
                    "this account does not belong to tenant '{slug}', sign in at {own}.{}",
                    self.base_domain
                ),
            );
        }

        debug!(user_id = %user.id, tenant = slug, "Tenant access granted");
        Ok(())
    }

    fn deny(&self, user: &User, reason: String) -> Result<(), AuthError> {
        warn!(user_id = %user.id, %reason, "Tenant access denied");
        Err(AuthError::TenantAccessDenied { reason })
    }
}
