//! End-to-end session flows against the in-memory store

use chirpy_auth::auth::{validate_access_token, Clock, ManualClock, SessionManager};
use chirpy_auth::configuration::AuthSettings;
use chirpy_auth::store::{AuthStore, InMemoryStore};
use chirpy_auth::AuthError;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const SECRET: &str = "integration-test-secret";
const EMAIL: &str = "walt@breakingbad.com";
const PASSWORD: &str = "04234";

struct TestApp {
    manager: SessionManager<InMemoryStore>,
    clock: Arc<ManualClock>,
}

async fn spawn_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let settings = Arc::new(AuthSettings::new(SECRET, "f271c81ff7084ee5b99a5091b42d486e"));
    let manager = SessionManager::with_clock(InMemoryStore::new(), settings, clock.clone());

    manager
        .register(EMAIL, PASSWORD)
        .await
        .expect("Failed to register test user");

    TestApp { manager, clock }
}

fn bearer(token: &str) -> HashMap<String, String> {
    HashMap::from([("Authorization".to_string(), format!("Bearer {}", token))])
}

#[tokio::test]
async fn login_issues_tokens_for_the_user() {
    let app = spawn_app().await;

    let session = app
        .manager
        .login(EMAIL, PASSWORD)
        .await
        .expect("Login failed");

    assert_eq!(session.email, EMAIL);
    assert_eq!(session.refresh_token.len(), 64);
    assert_eq!(
        validate_access_token(&session.token, SECRET).expect("Invalid access token"),
        session.user_id
    );
    assert_eq!(
        app.manager.authenticate(&bearer(&session.token)).unwrap(),
        session.user_id
    );
}

#[tokio::test]
async fn refresh_mints_a_new_access_token() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();

    app.clock.advance(Duration::hours(2));
    assert!(matches!(
        app.manager.authenticate(&bearer(&session.token)),
        Err(AuthError::Expired)
    ));

    let token = app
        .manager
        .refresh(&session.refresh_token)
        .await
        .expect("Refresh failed");

    assert_eq!(app.manager.codec().verify(&token).unwrap(), session.user_id);
}

#[tokio::test]
async fn revoked_refresh_token_is_rejected() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();

    app.manager
        .revoke(&session.refresh_token)
        .await
        .expect("Revoke failed");

    let result = app.manager.refresh(&session.refresh_token).await;
    assert!(matches!(result, Err(AuthError::TokenRevoked)));
}

#[tokio::test]
async fn revoking_twice_is_not_an_error() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();
    let first_revoke = app.clock.now();

    app.manager.revoke(&session.refresh_token).await.unwrap();
    app.clock.advance(Duration::minutes(5));
    app.manager.revoke(&session.refresh_token).await.unwrap();

    let stored = app
        .manager
        .store()
        .find_refresh_token(&session.refresh_token)
        .await
        .unwrap()
        .expect("Refresh token row missing");
    assert_eq!(stored.revoked_at, Some(first_revoke));
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();

    app.clock.advance(Duration::days(61));

    let result = app.manager.refresh(&session.refresh_token).await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let app = spawn_app().await;

    let wrong_password = app
        .manager
        .login(EMAIL, "wrong-password")
        .await
        .expect_err("Login with a wrong password must fail");
    let unknown_email = app
        .manager
        .login("nobody@example.com", PASSWORD)
        .await
        .expect_err("Login with an unknown email must fail");

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(wrong_password.code(), unknown_email.code());
}

#[tokio::test]
async fn sessions_are_independent() {
    let app = spawn_app().await;
    let first = app.manager.login(EMAIL, PASSWORD).await.unwrap();
    let second = app.manager.login(EMAIL, PASSWORD).await.unwrap();

    app.manager.revoke(&first.refresh_token).await.unwrap();

    assert!(app.manager.refresh(&second.refresh_token).await.is_ok());
}

#[tokio::test]
async fn admin_key_is_checked() {
    let app = spawn_app().await;
    let good = HashMap::from([(
        "Authorization".to_string(),
        "ApiKey f271c81ff7084ee5b99a5091b42d486e".to_string(),
    )]);
    let bad = HashMap::from([("Authorization".to_string(), "ApiKey nope".to_string())]);

    assert!(app.manager.authorize_admin(&good).is_ok());
    assert!(matches!(
        app.manager.authorize_admin(&bad),
        Err(AuthError::MissingCredential)
    ));
}

#[tokio::test]
async fn updated_credentials_replace_the_old_ones() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();
    let registered_at = app.clock.now();
    app.clock.advance(Duration::minutes(1));

    let user = app
        .manager
        .update_credentials(&bearer(&session.token), "heisenberg@breakingbad.com", "bluesky")
        .await
        .expect("Credential update failed");

    assert_eq!(user.id, session.user_id);
    assert_eq!(user.created_at, registered_at);
    assert_eq!(user.updated_at, app.clock.now());

    let relogin = app
        .manager
        .login("heisenberg@breakingbad.com", "bluesky")
        .await
        .expect("Login with new credentials failed");
    assert_eq!(relogin.user_id, session.user_id);
    assert!(matches!(
        app.manager.login(EMAIL, PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn updating_credentials_with_an_expired_token_fails() {
    let app = spawn_app().await;
    let session = app.manager.login(EMAIL, PASSWORD).await.unwrap();
    app.clock.advance(Duration::hours(1));

    let result = app
        .manager
        .update_credentials(&bearer(&session.token), "new@example.com", "pw")
        .await;

    assert!(matches!(result, Err(AuthError::Expired)));
    assert!(app.manager.login(EMAIL, PASSWORD).await.is_ok());
}
