/// PostgreSQL-backed `AuthStore`
///
/// Refresh tokens are stored verbatim and looked up by exact match. The
/// schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuthStore, RefreshTokenRecord, User};
use crate::error::StoreError;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(connection_string).await?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_insert_error(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(format!("{} already exists", what))
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, hashed_password, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(at)
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "user"))
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, hashed_password = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, email, hashed_password, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(hashed_password)
        .bind(at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "user"))
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (token, created_at, updated_at, user_id, expires_at, revoked_at)
            VALUES ($1, $2, $2, $3, $4, NULL)
            RETURNING token, user_id, created_at, expires_at, revoked_at
            "#,
        )
        .bind(token)
        .bind(created_at)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "refresh token"))
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT token, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        // revoked_at is set once; a repeat revoke matches the row but changes nothing.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1),
                updated_at = CASE WHEN revoked_at IS NULL THEN $1 ELSE updated_at END
            WHERE token = $2
            "#,
        )
        .bind(at)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM refresh_tokens").execute(&mut tx).await?;
        sqlx::query("DELETE FROM users").execute(&mut tx).await?;
        tx.commit().await?;

        tracing::info!("All users and refresh tokens deleted");
        Ok(())
    }
}
