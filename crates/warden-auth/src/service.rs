//! Authentication service: login, logout, password reset,
//! impersonation and magic-link orchestration.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;
use warden_core::clock::{Clock, SystemClock};
use warden_core::models::grant::GrantPurpose;
use warden_core::models::user::{TenantRef, User};
use warden_core::repository::{SessionRepository, TenantRepository, UserRepository};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::gate::Principal;
use crate::grant::GrantManager;
use crate::mailer::Mailer;
use crate::password;
use crate::policy::TenantAccessPolicy;
use crate::session::{ClientMeta, SessionRegistry};
use crate::signer::AccessTokenSigner;
use crate::token;

/// Response to every `forgot_password` call, whether or not mail was sent.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If this email exists, a password reset link has been sent.";

/// Credentials for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// What callers may see of a user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub tenant: Option<TenantRef>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            tenant: user.tenant.clone(),
        }
    }
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed access token; also the key of the new session.
    pub access_token: String,
    pub user: UserView,
}

/// Handed directly to the impersonating super-admin; never mailed.
#[derive(Debug)]
pub struct ImpersonationGrant {
    /// Raw one-time secret for `magic_login`.
    pub secret: String,
    /// Host the secret must be redeemed on.
    pub tenant_slug: String,
    pub target: UserView,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    users: U,
    policy: TenantAccessPolicy<T>,
    grants: GrantManager<U>,
    sessions: SessionRegistry<S>,
    mailer: M,
    signer: Arc<dyn AccessTokenSigner>,
    config: AuthConfig,
    reset_ttl: Duration,
    impersonation_ttl: Duration,
}

impl<U, T, S, M> AuthService<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    /// Fails with [`AuthError::InvalidConfig`] when a configured lifetime
    /// does not fit a [`Duration`].
    pub fn new(
        users: U,
        tenants: T,
        sessions: S,
        mailer: M,
        signer: Arc<dyn AccessTokenSigner>,
        config: AuthConfig,
    ) -> Result<Self, AuthError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let session_ttl = config.session_lifetime()?;
        let reset_ttl = config.password_reset_lifetime()?;
        let impersonation_ttl = config.impersonation_lifetime()?;
        Ok(Self {
            policy: TenantAccessPolicy::new(tenants, config.base_domain.clone()),
            grants: GrantManager::new(users.clone(), Arc::clone(&clock)),
            sessions: SessionRegistry::new(sessions, clock, session_ttl),
            users,
            mailer,
            signer,
            config,
            reset_ttl,
            impersonation_ttl,
        })
    }

    /// Replace the time source used for every expiry decision.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.grants.set_clock(Arc::clone(&clock));
        self.sessions.set_clock(clock);
        self
    }

    pub fn sessions(&self) -> &SessionRegistry<S> {
        &self.sessions
    }

    pub(crate) fn users(&self) -> &U {
        &self.users
    }

    pub(crate) fn policy(&self) -> &TenantAccessPolicy<T> {
        &self.policy
    }

    pub(crate) fn signer(&self) -> &dyn AccessTokenSigner {
        self.signer.as_ref()
    }

    /// Authenticate with email + password on the host identified by
    /// `tenant_slug`, and open the user's only session.
    pub async fn login(
        &self,
        input: LoginInput,
        tenant_slug: Option<&str>,
        client: &ClientMeta,
    ) -> Result<LoginOutput, AuthError> {
        let user = match self.users.get_by_email(&input.email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                warn!(tenant = tenant_slug.unwrap_or("-"), "Login for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "Login to inactive account");
            return Err(AuthError::AccountInactive);
        }

        self.policy.validate(&user, tenant_slug).await?;
        let output = self.open_session(&user, false, client).await?;

        info!(user_id = %user.id, tenant = user.tenant_slug().unwrap_or("-"), "Login succeeded");
        Ok(output)
    }

    /// Close the session opened with `access_token`. Idempotent.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        self.sessions.close(access_token).await
    }

    /// Close every session of `user_id`.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        self.sessions.close_all(user_id).await
    }

    /// Liveness check used by the session gate.
    pub async fn validate_session(&self, access_token: &str) -> Result<bool, AuthError> {
        self.sessions.validate(access_token).await
    }

    /// Start a password reset. The returned message is the same whether or
    /// not anything was sent.
    pub async fn forgot_password(
        &self,
        email: &str,
        tenant_slug: Option<&str>,
    ) -> Result<&'static str, AuthError> {
        let user = match self.users.get_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                info!(tenant = tenant_slug.unwrap_or("-"), "Password reset for unknown email");
                return Ok(FORGOT_PASSWORD_MESSAGE);
            }
            Err(e) => return Err(e.into()),
        };

        let tenant_slug = tenant_slug.filter(|s| !s.is_empty());
        if !user.is_active || user.tenant_slug() != tenant_slug {
            info!(user_id = %user.id, "Password reset not issued for this host");
            return Ok(FORGOT_PASSWORD_MESSAGE);
        }

        let (secret, _) = self
            .grants
            .issue(user.id, GrantPurpose::PasswordReset, self.reset_ttl)
            .await?;

        if let Err(e) = self
            .mailer
            .send_password_reset(&user, &secret, user.tenant_slug())
            .await
        {
            error!(user_id = %user.id, error = %e, "Password reset mail failed");
            return Err(AuthError::DeliveryFailure(e.to_string()));
        }

        Ok(FORGOT_PASSWORD_MESSAGE)
    }

    /// Finish a password reset. Does not open a session.
    pub async fn reset_password(&self, secret: &str, new_password: &str) -> Result<(), AuthError> {
        let min = self.config.min_password_length;
        if new_password.chars().count() < min {
            return Err(AuthError::WeakPassword { min });
        }

        let user = self.grants.resolve(secret, GrantPurpose::PasswordReset).await?;
        self.grants.validate_not_expired(&user)?;

        let hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.grants.commit_password_reset(&user, &hash).await?;
        info!(user_id = %user.id, "Password reset");

        if self.config.revoke_sessions_on_password_reset {
            self.sessions.close_all(user.id).await?;
        }
        Ok(())
    }

    /// Issue an impersonation grant for `target_id`. Only tenant-less
    /// principals may impersonate, and only tenant-bound users can be
    /// impersonated.
    pub async fn impersonate(
        &self,
        target_id: Uuid,
        acting: &Principal,
    ) -> Result<ImpersonationGrant, AuthError> {
        if !acting.is_super_admin() {
            warn!(acting = %acting.user_id, target = %target_id, "Impersonation by tenant user refused");
            return Err(AuthError::AuthorizationDenied {
                reason: "only super admins can impersonate".into(),
            });
        }

        let target = match self.users.get_by_id(target_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };

        let Some(tenant_slug) = target.tenant_slug().map(str::to_owned) else {
            return Err(AuthError::AuthorizationDenied {
                reason: "target does not belong to a tenant".into(),
            });
        };

        let (secret, grant) = self
            .grants
            .issue(target.id, GrantPurpose::Impersonation, self.impersonation_ttl)
            .await?;

        info!(
            acting = %acting.user_id,
            target = %target.id,
            tenant = %tenant_slug,
            "Impersonation grant issued"
        );
        Ok(ImpersonationGrant {
            secret,
            tenant_slug,
            target: UserView::from(&target),
            expires_at: grant.expires_at,
        })
    }

    /// Redeem an impersonation grant on the target tenant's host.
    pub async fn magic_login(
        &self,
        secret: &str,
        tenant_slug: Option<&str>,
        client: &ClientMeta,
    ) -> Result<LoginOutput, AuthError> {
        let user = self.grants.resolve(secret, GrantPurpose::Impersonation).await?;
        self.grants.validate_not_expired(&user)?;

        if !user.is_active {
            warn!(user_id = %user.id, "Magic login to inactive account");
            return Err(AuthError::AccountInactive);
        }
        self.policy.validate(&user, tenant_slug).await?;

        self.grants.consume(&user).await?;
        let output = self.open_session(&user, true, client).await?;

        info!(user_id = %user.id, grant = %token::fingerprint(secret), "Magic login succeeded");
        Ok(output)
    }

    /// Sign a fresh token for an authenticated principal and move its
    /// session to it.
    pub async fn reissue(
        &self,
        principal: &Principal,
        tenant_slug: Option<&str>,
        client: &ClientMeta,
    ) -> Result<LoginOutput, AuthError> {
        let user = self.load_active(principal.user_id).await?;
        self.policy.validate(&user, tenant_slug).await?;
        self.open_session(&user, principal.impersonated, client).await
    }

    /// Current view of the principal's account.
    pub async fn current_user(&self, principal: &Principal) -> Result<UserView, AuthError> {
        let user = self.load_active(principal.user_id).await?;
        Ok(UserView::from(&user))
    }

    async fn load_active(&self, user_id: Uuid) -> Result<User, AuthError> {
        let user = match self.users.get_by_id(user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(AuthError::UserNotFound),
            Err(e) => return Err(e.into()),
        };
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }
        Ok(user)
    }

    async fn open_session(
        &self,
        user: &User,
        impersonated: bool,
        client: &ClientMeta,
    ) -> Result<LoginOutput, AuthError> {
        let access_token = self.signer.sign(user, impersonated)?;
        self.sessions.create(user.id, &access_token, client).await?;
        Ok(LoginOutput {
            access_token,
            user: UserView::from(user),
        })
    }
}

impl<U, T, S, M> fmt::Debug for AuthService<U, T, S, M>
where
    U: UserRepository + Clone,
    T: TenantRepository,
    S: SessionRepository,
    M: Mailer,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}
