/// Credential extraction from request headers
///
/// Parses the `Authorization` header into a bearer token or an API key. The
/// parsing works over any `HeaderSource`, so it can run in front of any
/// router.

use actix_web::http::header::HeaderMap;
use std::collections::HashMap;
use subtle::ConstantTimeEq;

use crate::error::AuthError;

pub const AUTHORIZATION: &str = "Authorization";
pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// Read-only view over request headers
pub trait HeaderSource {
    /// Value of the header `name`, if present and valid text. Lookup is
    /// case-insensitive; an exact-case match is preferred.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}

// An exact-case key wins. Otherwise, among keys that differ from `name` only
// in case, the lexicographically smallest is used so the result does not
// depend on hash order.
impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .filter(|(key, _)| key.eq_ignore_ascii_case(name))
                    .min_by(|(a, _), (b, _)| a.cmp(b))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

/// A credential presented in the `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    ApiKey(String),
}

fn authorization<H: HeaderSource + ?Sized>(headers: &H) -> Option<&str> {
    headers.header(AUTHORIZATION).filter(|value| !value.is_empty())
}

/// Extract the token from `Authorization: <scheme> <token>`
///
/// The scheme word is not checked; whatever follows the first space is
/// returned as-is and left for token verification to reject.
///
/// # Errors
/// - `MissingHeader` if the header is absent or empty
/// - `MalformedHeader` if the value has no space-separated token
pub fn extract_bearer<H: HeaderSource + ?Sized>(headers: &H) -> Result<String, AuthError> {
    let value = authorization(headers).ok_or(AuthError::MissingHeader)?;

    value
        .split(' ')
        .nth(1)
        .map(str::to_string)
        .ok_or(AuthError::MalformedHeader)
}

/// Extract the key from `Authorization: ApiKey <key>`
///
/// An absent header, another scheme, and a missing key all fail the same way.
pub fn extract_api_key<H: HeaderSource + ?Sized>(headers: &H) -> Result<String, AuthError> {
    let value = authorization(headers).ok_or(AuthError::MissingCredential)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next()) {
        (Some(API_KEY_SCHEME), Some(key)) => Ok(key.to_string()),
        _ => Err(AuthError::MissingCredential),
    }
}

/// Classify the `Authorization` header by scheme
pub fn extract_credential<H: HeaderSource + ?Sized>(headers: &H) -> Result<Credential, AuthError> {
    let value = authorization(headers).ok_or(AuthError::MissingCredential)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token)) => Ok(Credential::Bearer(token.to_string())),
        (Some(API_KEY_SCHEME), Some(key)) => Ok(Credential::ApiKey(key.to_string())),
        _ => Err(AuthError::MissingCredential),
    }
}

/// Check the request carries the configured administrative key
///
/// A wrong key is reported exactly like a missing one. An empty configured
/// key never matches.
pub fn authorize_api_key<H: HeaderSource + ?Sized>(
    headers: &H,
    expected: &str,
) -> Result<(), AuthError> {
    let presented = extract_api_key(headers)?;

    if expected.is_empty() || !bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Rejected request with an invalid API key");
        return Err(AuthError::MissingCredential);
    }

    Ok(())
}
