/// JWT Claims structure
///
/// Registered claims (RFC 7519) carried by every access token.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Issuer stamped into every access token
pub const ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Claims for `user_id` issued at `issued_at` and valid for `ttl`.
    ///
    /// A zero or negative `ttl` produces claims that are already expired.
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `InvalidSubject` if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidSubject)
    }

    /// Expired once `now` reaches `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
