//! Per-request session gate.
//!
//! [`SessionGate::authenticate`] runs ahead of every protected handler
//! and turns the raw request context into a [`Principal`]:
//!
//! 1. extract the bearer token from the `Authorization` header,
//! 2. verify signature and expiry,
//! 3. require a live session for the token,
//! 4. require the account to still exist and be active,
//! 5. apply the tenant access policy, unless the route opts out.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;
use warden_core::repository::{SessionRepository, TenantRepository, UserRepository};

use crate::error::AuthError;
use crate::mailer::Mailer;
use crate::service::AuthService;
use crate::token;

/// Request data the gate needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    /// Tenant slug resolved for the request host.
    pub tenant_slug: Option<&'a str>,
    /// Skip the tenant check (routes that serve every host).
    pub allow_any_tenant: bool,
}

/// The authenticated caller, passed explicitly to service operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_slug: Option<String>,
    pub impersonated: bool,
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub struct SessionGate<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    service: Arc<AuthService<U, T, S, M>>,
}

impl<U, T, S, M> std::fmt::Debug for SessionGate<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate").finish_non_exhaustive()
    }
}

impl<U, T, S, M> SessionGate<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    pub fn new(service: Arc<AuthService<U, T, S, M>>) -> Self {
        Self { service }
    }

    pub async fn authenticate(&self, ctx: &RequestContext<'_>) -> Result<Principal, AuthError> {
        let token = ctx
            .authorization
            .and_then(extract_bearer_token)
            .ok_or_else(|| AuthError::TokenInvalid("missing bearer token".into()))?;

        let claims = self.service.signer().verify(token)?;

        if !self.service.validate_session(token).await? {
            warn!(sub = %claims.sub, token = %token::fingerprint(token), "Bearer without live session");
            return Err(AuthError::SessionRevoked);
        }

        let user = match self.service.users().get_by_id(claims.user_id()?).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };
        if !user.is_active {
            warn!(user_id = %user.id, "Bearer for inactive account");
            return Err(AuthError::AccountInactive);
        }

        if !ctx.allow_any_tenant {
            self.service.policy().validate(&user, ctx.tenant_slug).await?;
        }

        debug!(user_id = %user.id, impersonated = claims.impersonated, "Request authenticated");
        Ok(Principal {
            user_id: user.id,
            tenant_id: user.tenant.as_ref().map(|t| t.id),
            tenant_slug: user.tenant_slug().map(str::to_owned),
            email: user.email,
            role: user.role,
            impersonated: claims.impersonated,
        })
    }
}
