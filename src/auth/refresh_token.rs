/// Refresh Token Generation
///
/// Refresh tokens are opaque: 32 bytes from the operating system's CSPRNG,
/// hex-encoded to 64 lowercase characters. They have no relation to the
/// access token format and carry no information themselves.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AuthError;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate a new cryptographically secure refresh token
///
/// # Errors
/// Returns `EntropyFailure` if the OS random source is unavailable
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut key = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| AuthError::EntropyFailure(e.to_string()))?;

    Ok(hex::encode(key))
}
