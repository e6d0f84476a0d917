use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuthStore, RefreshTokenRecord, User};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// Process-local store, for tests and single-node development
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    pub async fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.tables
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuthStore for InMemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.email == email).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|user| user.email == email) {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            created_at: at,
            updated_at: at,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|user| user.id != id && user.email == email)
        {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        Ok(tables.users.get_mut(&id).map(|user| {
            user.email = email.to_string();
            user.hashed_password = hashed_password.to_string();
            user.updated_at = at;
            user.clone()
        }))
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::Conflict(format!("unknown user {}", user_id)));
        }
        if tables.refresh_tokens.contains_key(token) {
            return Err(StoreError::Conflict("duplicate refresh token".to_string()));
        }

        let record = RefreshTokenRecord::new(token.to_string(), user_id, created_at, expires_at);
        tables
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.tables.read().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(token) {
            Some(record) => {
                record.revoke(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.refresh_tokens.clear();
        tables.users.clear();
        Ok(())
    }
}
