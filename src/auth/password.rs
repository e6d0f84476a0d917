/// Password Hashing and Verification
///
/// Salted bcrypt hashes at the library's default cost.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::error::AuthError;

lazy_static! {
    // Stand-in hash at the same cost as real ones, so a login for an unknown
    // account spends as long in bcrypt as one with a wrong password.
    static ref DUMMY_HASH: Option<String> = hash("chirpy-dummy-password", DEFAULT_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `HashFailure` if bcrypt cannot produce a hash
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash(password, DEFAULT_COST).map_err(|e| AuthError::HashFailure(e.to_string()))
}

/// Verify a password against its hash
///
/// # Errors
/// - `InvalidCredentials` if the password does not match
/// - `HashFailure` if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    match verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::InvalidCredentials),
        Err(e) => Err(AuthError::HashFailure(e.to_string())),
    }
}

/// Run a full bcrypt verification whose outcome is discarded.
pub(crate) fn verify_against_dummy(password: &str) {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        let _ = verify(password, dummy);
    }
}
