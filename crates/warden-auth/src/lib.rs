//! Warden Auth: credential verification, tenant access policy, one-time
//! grants (password reset and impersonation), single-active-session
//! enforcement and the per-request session gate.

pub mod config;
pub mod error;
pub mod gate;
pub mod grant;
pub mod mailer;
pub mod password;
pub mod policy;
pub mod service;
pub mod session;
pub mod signer;
pub mod tenant_context;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use gate::{Principal, RequestContext, SessionGate};
pub use mailer::Mailer;
pub use service::{AuthService, ImpersonationGrant, LoginInput, LoginOutput, UserView};
pub use session::{ClientMeta, SessionRegistry};
pub use signer::{AccessTokenClaims, AccessTokenSigner, JwtSigner};
pub use tenant_context::TenantContextResolver;
