/// JWT Token Generation and Validation
///
/// Access tokens are HS256-signed JWTs carrying the `Claims` registered set.
/// Validation always checks the signature before looking at expiry, so a
/// forged token never reveals whether it would have been expired.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::auth::clock::{Clock, SystemClock};
use crate::error::AuthError;

/// Generate a new access token for a user
///
/// A zero or negative `ttl` yields a token that is already expired.
///
/// # Errors
/// Returns `SigningFailure` if the token cannot be encoded
pub fn generate_access_token(
    user_id: &Uuid,
    secret: &str,
    ttl: Duration,
) -> Result<String, AuthError> {
    encode_claims(&Claims::new(*user_id, Utc::now(), ttl), secret)
}

/// Validate an access token and return the user it was issued for
///
/// # Errors
/// - `Malformed` if the token is not three dot-separated segments or its
///   header/claims cannot be decoded
/// - `InvalidSignature` if the MAC does not match `secret`
/// - `InvalidIssuer` if the token was not issued by this service
/// - `Expired` if the current time has reached `exp`
/// - `InvalidSubject` if the subject is not a user id
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    decode_claims(token, secret, Utc::now())?.user_id()
}

fn encode_claims(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::SigningFailure(e.to_string()))
}

fn decode_claims(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    if token.split('.').count() != 3 {
        return Err(AuthError::Malformed);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is checked below against the caller's clock, with no leeway.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    validation.set_issuer(&[ISSUER]);

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("JWT validation error: {}", e);
        map_jwt_error(e.kind())
    })?;

    if claims.is_expired_at(now) {
        return Err(AuthError::Expired);
    }

    Ok(claims)
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidSubject => AuthError::InvalidSubject,
        _ => AuthError::Malformed,
    }
}

/// Access token codec bound to a signing secret and a clock
#[derive(Clone)]
pub struct AccessTokenCodec {
    secret: Arc<str>,
    clock: Arc<dyn Clock>,
}

impl AccessTokenCodec {
    pub fn new(secret: &str) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret: Arc::from(secret),
            clock,
        }
    }

    /// Issue a token for `user_id` valid for `ttl` from the codec's now.
    pub fn issue(&self, user_id: &Uuid, ttl: Duration) -> Result<String, AuthError> {
        encode_claims(&Claims::new(*user_id, self.clock.now(), ttl), &self.secret)
    }

    /// Verify a token and return its subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.claims(token)?.user_id()
    }

    /// Verify a token and return its full claim set.
    pub fn claims(&self, token: &str) -> Result<Claims, AuthError> {
        decode_claims(token, &self.secret, self.clock.now())
    }
}

impl fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenCodec")
            .field("secret", &"[redacted]")
            .field("clock", &self.clock)
            .finish()
    }
}
