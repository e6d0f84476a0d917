/// Session orchestration
///
/// A login session moves through
/// `Unauthenticated -> Authenticated -> Refreshed* -> Revoked`:
/// login issues an access token and a refresh token row, refresh mints new
/// access tokens from an active row without touching it, and revoke ends the
/// row for good.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::credentials::{authorize_api_key, extract_bearer, HeaderSource};
use crate::auth::jwt::AccessTokenCodec;
use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::auth::refresh_token::generate_refresh_token;
use crate::configuration::AuthSettings;
use crate::error::AuthError;
use crate::store::{AuthStore, TokenStatus, User};

/// Tokens handed out on a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionManager<S> {
    store: S,
    settings: Arc<AuthSettings>,
    codec: AccessTokenCodec,
    clock: Arc<dyn Clock>,
}

impl<S: AuthStore> SessionManager<S> {
    pub fn new(store: S, settings: Arc<AuthSettings>) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, settings: Arc<AuthSettings>, clock: Arc<dyn Clock>) -> Self {
        let codec = AccessTokenCodec::with_clock(&settings.jwt_secret, clock.clone());
        Self {
            store,
            settings,
            codec,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &AccessTokenCodec {
        &self.codec
    }

    fn access_token_ttl(&self) -> Result<Duration, AuthError> {
        self.settings.access_token_ttl().ok_or_else(|| {
            AuthError::Configuration("access token lifetime is out of range".to_string())
        })
    }

    fn refresh_token_expiry(&self, created_at: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        self.settings
            .refresh_token_ttl()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Configuration("refresh token lifetime is out of range".to_string())
            })
    }

    /// Create a user with a freshly hashed password.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let hashed_password = hash_password(password)?;
        let user = self
            .store
            .create_user(email, &hashed_password, self.clock.now())
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Authenticate with email and password and open a new session.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password alike
    /// - `Configuration` if a token lifetime is out of range
    /// - `HashFailure`, `SigningFailure`, `EntropyFailure`, `Storage` on
    ///   internal failures
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AuthError> {
        let user = match self.store.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                verify_against_dummy(password);
                tracing::warn!("Login attempt for unknown account");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Err(e) = verify_password(password, &user.hashed_password) {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::warn!(user_id = %user.id, "Login attempt with wrong password");
            }
            return Err(e);
        }

        let token = self.codec.issue(&user.id, self.access_token_ttl()?)?;

        let refresh_token = generate_refresh_token()?;
        let created_at = self.clock.now();
        let expires_at = self.refresh_token_expiry(created_at)?;
        let record = self
            .store
            .create_refresh_token(&refresh_token, user.id, created_at, expires_at)
            .await?;

        tracing::info!(user_id = %user.id, "User logged in successfully");

        Ok(LoginSession {
            user_id: user.id,
            email: user.email,
            token,
            refresh_token: record.token,
            refresh_token_expires_at: record.expires_at,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh token row is neither rotated nor extended.
    ///
    /// # Errors
    /// - `InvalidToken` if no such refresh token exists
    /// - `TokenExpired` if it is past its expiry
    /// - `TokenRevoked` if it has been revoked
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Refresh token not found");
                AuthError::InvalidToken
            })?;

        match record.status(self.clock.now()) {
            TokenStatus::Expired => {
                tracing::info!(user_id = %record.user_id, "Refresh token expired");
                Err(AuthError::TokenExpired)
            }
            TokenStatus::Revoked => {
                tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
                Err(AuthError::TokenRevoked)
            }
            TokenStatus::Active => {
                let token = self.codec.issue(&record.user_id, self.access_token_ttl()?)?;
                tracing::info!(user_id = %record.user_id, "Access token refreshed");
                Ok(token)
            }
        }
    }

    /// Revoke a refresh token. Revoking twice is not an error.
    ///
    /// # Errors
    /// Returns `InvalidToken` if no such refresh token exists
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let found = self
            .store
            .revoke_refresh_token(refresh_token, self.clock.now())
            .await?;

        if !found {
            return Err(AuthError::InvalidToken);
        }

        tracing::info!("Refresh token revoked");
        Ok(())
    }

    /// Change the email and password of the user behind the bearer token.
    ///
    /// # Errors
    /// - access token and header failures as for `authenticate`
    /// - `InvalidCredentials` if the token's user no longer exists
    /// - `Storage(Conflict)` if the email belongs to another user
    pub async fn update_credentials<H: HeaderSource + ?Sized>(
        &self,
        headers: &H,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let user_id = self.authenticate(headers)?;
        let hashed_password = hash_password(password)?;

        let user = self
            .store
            .update_user(user_id, email, &hashed_password, self.clock.now())
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "Credential update for missing user");
                AuthError::InvalidCredentials
            })?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user)
    }

    /// Resolve the user behind `Authorization: Bearer <access token>`.
    pub fn authenticate<H: HeaderSource + ?Sized>(&self, headers: &H) -> Result<Uuid, AuthError> {
        let token = extract_bearer(headers)?;
        self.codec.verify(&token)
    }

    /// Check `Authorization: ApiKey <key>` against the configured key.
    pub fn authorize_admin<H: HeaderSource + ?Sized>(&self, headers: &H) -> Result<(), AuthError> {
        authorize_api_key(headers, &self.settings.api_key)
    }

    /// Delete all users and sessions. Only permitted on the dev platform.
    pub async fn reset(&self) -> Result<(), AuthError> {
        if !self.settings.is_dev_platform() {
            tracing::warn!(platform = %self.settings.platform, "Reset refused");
            return Err(AuthError::ResetForbidden);
        }

        self.store.reset().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::credentials::AUTHORIZATION;
    use crate::error::StoreError;
    use crate::store::InMemoryStore;
    use std::collections::HashMap;
    use std::time::Instant;

    fn bearer(token: &str) -> HashMap<String, String> {
        HashMap::from([(AUTHORIZATION.to_string(), format!("Bearer {}", token))])
    }

    fn manager(clock: Arc<ManualClock>) -> SessionManager<InMemoryStore> {
        let settings = Arc::new(AuthSettings::new("session-test-secret", "admin-key"));
        SessionManager::with_clock(InMemoryStore::new(), settings, clock)
    }

    #[tokio::test]
    async fn test_login_persists_one_row_per_login() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        let user = manager.register("user@example.com", "04234").await.unwrap();

        let first = manager.login("user@example.com", "04234").await.unwrap();
        let second = manager.login("user@example.com", "04234").await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(manager.store().refresh_tokens_for(user.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_expiry_is_sixty_days() {
        let start = Utc::now();
        let manager = manager(Arc::new(ManualClock::new(start)));
        manager.register("user@example.com", "04234").await.unwrap();

        let session = manager.login("user@example.com", "04234").await.unwrap();

        assert_eq!(session.refresh_token_expires_at, start + Duration::days(60));
    }

    #[tokio::test]
    async fn test_refresh_leaves_row_untouched() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        manager.register("user@example.com", "04234").await.unwrap();
        let session = manager.login("user@example.com", "04234").await.unwrap();
        let before = manager
            .store()
            .find_refresh_token(&session.refresh_token)
            .await
            .unwrap();

        manager.refresh(&session.refresh_token).await.unwrap();

        let after = manager
            .store()
            .find_refresh_token(&session.refresh_token)
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_refresh_unknown_token() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));

        let result = manager.refresh("does-not-exist").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));

        let result = manager.revoke("does-not-exist").await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_and_revoked_reports_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = manager(clock.clone());
        manager.register("user@example.com", "04234").await.unwrap();
        let session = manager.login("user@example.com", "04234").await.unwrap();

        manager.revoke(&session.refresh_token).await.unwrap();
        clock.advance(Duration::days(60));

        let result = manager.refresh(&session.refresh_token).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_register_uses_injected_clock() {
        let start = Utc::now() - Duration::days(400);
        let manager = manager(Arc::new(ManualClock::new(start)));

        let user = manager.register("user@example.com", "04234").await.unwrap();

        assert_eq!(user.created_at, start);
        assert_eq!(user.updated_at, start);
    }

    #[tokio::test]
    async fn test_oversized_refresh_lifetime_fails_without_panicking() {
        let mut settings = AuthSettings::new("session-test-secret", "admin-key");
        settings.refresh_token_ttl_days = 100_000_000;
        let manager = SessionManager::with_clock(
            InMemoryStore::new(),
            Arc::new(settings),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let user = manager.register("user@example.com", "04234").await.unwrap();

        let result = manager.login("user@example.com", "04234").await;

        assert!(matches!(result, Err(AuthError::Configuration(_))));
        assert!(manager.store().refresh_tokens_for(user.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_access_lifetime_is_a_configuration_error() {
        let mut settings = AuthSettings::new("session-test-secret", "admin-key");
        settings.access_token_ttl_seconds = i64::MAX;
        let manager = SessionManager::with_clock(
            InMemoryStore::new(),
            Arc::new(settings),
            Arc::new(ManualClock::new(Utc::now())),
        );
        manager.register("user@example.com", "04234").await.unwrap();

        let result = manager.login("user@example.com", "04234").await;
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unknown_email_costs_a_bcrypt_verification() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        manager.register("user@example.com", "04234").await.unwrap();
        // Warm up the stand-in hash so its one-time cost is not measured.
        let _ = manager.login("nobody@example.com", "wrong").await;

        let started = Instant::now();
        let unknown = manager.login("nobody@example.com", "wrong").await;
        let unknown_elapsed = started.elapsed();

        let started = Instant::now();
        let wrong_password = manager.login("user@example.com", "wrong").await;
        let wrong_password_elapsed = started.elapsed();

        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(
            unknown_elapsed * 10 > wrong_password_elapsed,
            "unknown email took {:?}, wrong password took {:?}",
            unknown_elapsed,
            wrong_password_elapsed
        );
    }

    #[tokio::test]
    async fn test_update_credentials() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = manager(clock.clone());
        let user = manager.register("walt@breakingbad.com", "04234").await.unwrap();
        let session = manager.login("walt@breakingbad.com", "04234").await.unwrap();
        clock.advance(Duration::minutes(5));

        let updated = manager
            .update_credentials(&bearer(&session.token), "heisenberg@breakingbad.com", "bluesky")
            .await
            .unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.email, "heisenberg@breakingbad.com");
        assert_eq!(updated.updated_at, clock.now());
        assert!(manager.login("heisenberg@breakingbad.com", "bluesky").await.is_ok());
        assert!(matches!(
            manager.login("walt@breakingbad.com", "04234").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_credentials_requires_valid_token() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        manager.register("walt@breakingbad.com", "04234").await.unwrap();

        let missing = manager
            .update_credentials(&HashMap::new(), "new@example.com", "pw")
            .await;
        let forged = manager
            .update_credentials(&bearer("not.a.token"), "new@example.com", "pw")
            .await;

        assert!(matches!(missing, Err(AuthError::MissingHeader)));
        assert!(matches!(forged, Err(AuthError::InvalidSignature) | Err(AuthError::Malformed)));
        assert!(manager
            .store()
            .find_user_by_email("new@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_credentials_email_taken() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        manager.register("gus@pollos.com", "04234").await.unwrap();
        manager.register("mike@pollos.com", "04234").await.unwrap();
        let session = manager.login("mike@pollos.com", "04234").await.unwrap();

        let result = manager
            .update_credentials(&bearer(&session.token), "gus@pollos.com", "pw")
            .await;

        assert!(matches!(result, Err(AuthError::Storage(StoreError::Conflict(_)))));
    }

    #[tokio::test]
    async fn test_update_credentials_for_deleted_user() {
        let settings = Arc::new(AuthSettings::new("secret", "key").with_platform("dev"));
        let manager = SessionManager::new(InMemoryStore::new(), settings);
        manager.register("user@example.com", "04234").await.unwrap();
        let session = manager.login("user@example.com", "04234").await.unwrap();
        manager.reset().await.unwrap();

        let result = manager
            .update_credentials(&bearer(&session.token), "user@example.com", "pw")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_reset_outside_dev_is_forbidden() {
        let manager = manager(Arc::new(ManualClock::new(Utc::now())));
        manager.register("user@example.com", "04234").await.unwrap();

        let result = manager.reset().await;

        assert!(matches!(result, Err(AuthError::ResetForbidden)));
        assert_eq!(manager.store().user_count().await, 1);
    }

    #[tokio::test]
    async fn test_reset_on_dev_platform() {
        let settings = Arc::new(AuthSettings::new("secret", "key").with_platform("dev"));
        let manager = SessionManager::new(InMemoryStore::new(), settings);
        manager.register("user@example.com", "04234").await.unwrap();

        manager.reset().await.unwrap();

        assert_eq!(manager.store().user_count().await, 0);
    }
}
