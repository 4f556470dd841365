//! Integration tests for the per-request session gate.

mod support;

use chrono::Duration;
use support::setup;
use warden_auth::gate::RequestContext;
use warden_auth::AuthError;
use warden_core::models::user::UpdateUser;
use warden_core::repository::UserRepository;

fn ctx<'a>(header: &'a str, tenant: Option<&'a str>) -> RequestContext<'a> {
    RequestContext {
        authorization: Some(header),
        tenant_slug: tenant,
        allow_any_tenant: false,
    }
}

#[tokio::test]
async fn valid_bearer_yields_principal() {
    let env = setup().await;
    let out = env.login("u1@acme.test", Some("acme")).await;

    let header = format!("Bearer {}", out.access_token);
    let principal = env.gate.authenticate(&ctx(&header, Some("acme"))).await.unwrap();

    assert_eq!(principal.user_id, env.u1.id);
    assert_eq!(principal.email, "u1@acme.test");
    assert_eq!(principal.tenant_id, Some(env.acme.id));
    assert_eq!(principal.tenant_slug.as_deref(), Some("acme"));
    assert!(!principal.impersonated);
    assert!(!principal.is_super_admin());
}

#[tokio::test]
async fn missing_header_is_rejected() {
    let env = setup().await;
    let err = env
        .gate
        .authenticate(&RequestContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn forged_bearer_is_rejected() {
    let env = setup().await;
    let err = env
        .gate
        .authenticate(&ctx("Bearer not.a.token", Some("acme")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalid(_)));
}

#[tokio::test]
async fn bearer_of_replaced_session_is_revoked() {
    let env = setup().await;
    let old = env.login("u1@acme.test", Some("acme")).await;
    env.clock.advance(Duration::seconds(1));
    env.login("u1@acme.test", Some("acme")).await;

    let header = format!("Bearer {}", old.access_token);
    let err = env
        .gate
        .authenticate(&ctx(&header, Some("acme")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}

#[tokio::test]
async fn bearer_after_logout_is_revoked() {
    let env = setup().await;
    let out = env.login("u1@acme.test", Some("acme")).await;
    env.service.logout(&out.access_token).await.unwrap();

    let header = format!("Bearer {}", out.access_token);
    let err = env
        .gate
        .authenticate(&ctx(&header, Some("acme")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}

#[tokio::test]
async fn bearer_of_expired_session_is_revoked() {
    let env = setup().await;
    let out = env.login("u1@acme.test", Some("acme")).await;
    env.clock.advance(Duration::hours(25));

    let header = format!("Bearer {}", out.access_token);
    let err = env
        .gate
        .authenticate(&ctx(&header, Some("acme")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::SessionRevoked));
}

#[tokio::test]
async fn deactivated_account_is_rejected() {
    let env = setup().await;
    let out = env.login("u1@acme.test", Some("acme")).await;
    env.users
        .update(
            env.u1.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let header = format!("Bearer {}", out.access_token);
    let err = env
        .gate
        .authenticate(&ctx(&header, Some("acme")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountInactive));
}

#[tokio::test]
async fn bearer_on_foreign_host_is_denied_unless_route_allows_any() {
    let env = setup().await;
    let out = env.login("u1@acme.test", Some("acme")).await;
    let header = format!("Bearer {}", out.access_token);

    let err = env
        .gate
        .authenticate(&ctx(&header, Some("other")))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TenantAccessDenied { .. }));

    let principal = env
        .gate
        .authenticate(&RequestContext {
            allow_any_tenant: true,
            ..ctx(&header, Some("other"))
        })
        .await
        .unwrap();
    assert_eq!(principal.user_id, env.u1.id);
}

#[tokio::test]
async fn super_admin_principal_has_no_tenant() {
    let env = setup().await;
    let out = env.login("root@warden.test", None).await;
    let principal = env.principal(&out.access_token, None).await;
    assert!(principal.is_super_admin());
    assert_eq!(principal.tenant_slug, None);
}
