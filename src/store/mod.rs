/// Storage contract consumed by the session manager
///
/// The core only needs a handful of keyed operations on users and refresh
/// tokens. Each call is a single atomic read or write; retries, if any,
/// belong to the implementation.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;

/// A registered user as seen by the auth core
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usability of a refresh token at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Expired,
    Revoked,
}

/// A persisted refresh token
///
/// `revoked_at` is set at most once. Nothing else about a row ever changes.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    pub fn new(token: String, user_id: Uuid, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            created_at,
            expires_at,
            revoked_at: None,
        }
    }

    /// Expiry takes precedence over revocation.
    pub fn status(&self, now: DateTime<Utc>) -> TokenStatus {
        if now >= self.expires_at {
            TokenStatus::Expired
        } else if self.revoked_at.is_some() {
            TokenStatus::Revoked
        } else {
            TokenStatus::Active
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == TokenStatus::Active
    }

    /// Move the token from active to revoked.
    ///
    /// Returns `false` and keeps the original timestamp if it was already
    /// revoked.
    pub fn revoke(&mut self, at: DateTime<Utc>) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        self.revoked_at = Some(at);
        true
    }
}

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Look up a user by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Create a user stamped with `at`. Fails with `StoreError::Conflict` if
    /// the email is taken.
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    /// Replace a user's email and password hash, setting `updated_at` to `at`.
    ///
    /// Returns `None` if no such user exists. Fails with
    /// `StoreError::Conflict` if another user already has the email.
    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// Persist a newly issued refresh token.
    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError>;

    /// Look up a refresh token by exact string match.
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Mark a refresh token revoked at `at`.
    ///
    /// Returns `false` if no such token exists. Revoking an already revoked
    /// token succeeds and leaves the first `revoked_at` in place.
    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Delete every user and refresh token.
    async fn reset(&self) -> Result<(), StoreError>;
}
