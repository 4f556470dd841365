//! Integration tests for impersonation grants and magic login.

mod support;

use chrono::Duration;
use support::{client, create_tenant, create_user, setup};
use uuid::Uuid;
use warden_auth::AuthError;
use warden_core::clock::Clock;
use warden_core::models::tenant::TenantStatus;

#[tokio::test]
async fn tenant_user_cannot_impersonate() {
    let env = setup().await;
    let out = env.login("u2@other.test", Some("other")).await;
    let acting = env.principal(&out.access_token, Some("other")).await;

    let err = env.service.impersonate(env.u1.id, &acting).await.unwrap_err();
    assert!(matches!(err, AuthError::AuthorizationDenied { .. }));
    assert!(env.reload(&env.u1).await.pending_grant.is_none());
}

#[tokio::test]
async fn impersonating_unknown_user_is_not_found() {
    let env = setup().await;
    let out = env.login("root@warden.test", None).await;
    let acting = env.principal(&out.access_token, None).await;

    let err = env
        .service
        .impersonate(Uuid::new_v4(), &acting)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::UserNotFound));
}

#[tokio::test]
async fn super_admin_cannot_be_impersonated() {
    let env = setup().await;
    let out = env.login("root@warden.test", None).await;
    let acting = env.principal(&out.access_token, None).await;

    let err = env.service.impersonate(env.admin.id, &acting).await.unwrap_err();
    assert!(matches!(err, AuthError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn impersonation_round_trip() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;

    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();
    assert_eq!(grant.tenant_slug, "acme");
    assert_eq!(grant.target.id, env.u1.id);
    assert_eq!(grant.expires_at, env.clock.now() + Duration::minutes(5));
    // Never mailed.
    assert!(env.mailer.sent().is_empty());

    let out = env
        .service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap();
    assert_eq!(out.user.id, env.u1.id);

    let principal = env.principal(&out.access_token, Some("acme")).await;
    assert!(principal.impersonated);
    assert_eq!(principal.user_id, env.u1.id);
    assert_eq!(env.active_session_count(&env.u1).await, 1);

    // The grant is gone.
    assert!(env.reload(&env.u1).await.pending_grant.is_none());
    // The admin's own session is untouched.
    assert!(env.service.validate_session(&admin.access_token).await.unwrap());
}

#[tokio::test]
async fn consumed_secret_is_rejected_without_new_session() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    let first = env
        .service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap();

    let err = env
        .service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalidOrExpired));

    // The first session is still the only one.
    assert!(env.service.validate_session(&first.access_token).await.unwrap());
    assert_eq!(env.active_session_count(&env.u1).await, 1);
}

#[tokio::test]
async fn secret_expires_after_five_minutes() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    env.clock.advance(Duration::minutes(6));
    let err = env
        .service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalidOrExpired));
    assert_eq!(env.active_session_count(&env.u1).await, 0);
}

#[tokio::test]
async fn secret_is_valid_just_before_expiry() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    env.clock.advance(Duration::seconds(299));
    env.service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap();
}

#[tokio::test]
async fn magic_login_on_wrong_host_does_not_burn_secret() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    for ctx in [Some("other"), None] {
        let err = env
            .service
            .magic_login(&grant.secret, ctx, &client())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TenantAccessDenied { .. }));
    }
    assert_eq!(env.active_session_count(&env.u1).await, 0);

    env.service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap();
}

#[tokio::test]
async fn newer_impersonation_invalidates_older_secret() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;

    let first = env.service.impersonate(env.u1.id, &acting).await.unwrap();
    let second = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    let err = env
        .service
        .magic_login(&first.secret, Some("acme"), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalidOrExpired));
    env.service
        .magic_login(&second.secret, Some("acme"), &client())
        .await
        .unwrap();
}

#[tokio::test]
async fn impersonation_secret_cannot_reset_password() {
    let env = setup().await;
    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();

    let err = env
        .service
        .reset_password(&grant.secret, "a much longer passphrase")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenInvalidOrExpired));
}

#[tokio::test]
async fn impersonation_replaces_running_session() {
    let env = setup().await;
    let own = env.login("u1@acme.test", Some("acme")).await;

    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(env.u1.id, &acting).await.unwrap();
    env.service
        .magic_login(&grant.secret, Some("acme"), &client())
        .await
        .unwrap();

    assert!(!env.service.validate_session(&own.access_token).await.unwrap());
    assert_eq!(env.active_session_count(&env.u1).await, 1);
}

#[tokio::test]
async fn magic_login_into_suspended_tenant_is_denied() {
    let env = setup().await;
    let icebox = create_tenant(&env.tenants, "icebox", TenantStatus::Suspended).await;
    let target = create_user(&env.users, "ice@icebox.test", Some(&icebox)).await;

    let admin = env.login("root@warden.test", None).await;
    let acting = env.principal(&admin.access_token, None).await;
    let grant = env.service.impersonate(target.id, &acting).await.unwrap();
    assert_eq!(grant.tenant_slug, "icebox");

    let err = env
        .service
        .magic_login(&grant.secret, Some("icebox"), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TenantAccessDenied { reason } if reason.contains("suspended")));
    assert_eq!(env.active_session_count(&target).await, 0);
    // Refused before consumption.
    assert!(env.reload(&target).await.pending_grant.is_some());
}
