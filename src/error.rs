/// Error types for the authentication core
///
/// Every component returns a typed `AuthError`. The core never decides how an
/// error is presented to a client; see `middleware::response` for the HTTP
/// mapping used by the request guard.

use thiserror::Error;

/// Failures raised by an `AuthStore` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database rejected or failed the query
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// A row with the same unique key already exists
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Authentication and session errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases are reported identically.
    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("no authorization header provided")]
    MissingHeader,

    #[error("authorization header format must be <scheme> <token>")]
    MalformedHeader,

    /// API key absent, under the wrong scheme, or not the configured key
    #[error("missing or invalid credential")]
    MissingCredential,

    // Access token failures
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("token subject is not a valid user id")]
    InvalidSubject,
    #[error("token issuer is not recognised")]
    InvalidIssuer,

    // Refresh token failures
    #[error("refresh token has expired")]
    TokenExpired,
    #[error("refresh token has been revoked")]
    TokenRevoked,
    #[error("invalid refresh token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    SigningFailure(String),

    #[error("password hashing failed: {0}")]
    HashFailure(String),

    #[error("entropy source failed: {0}")]
    EntropyFailure(String),

    /// Settings that cannot be applied, such as a lifetime past the representable range
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("reset is only allowed on the dev platform")]
    ResetForbidden,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuthError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::MissingHeader => "MISSING_HEADER",
            AuthError::MalformedHeader => "MALFORMED_HEADER",
            AuthError::MissingCredential => "MISSING_CREDENTIAL",
            AuthError::InvalidSignature
            | AuthError::Expired
            | AuthError::Malformed
            | AuthError::InvalidSubject
            | AuthError::InvalidIssuer => "TOKEN_INVALID",
            AuthError::TokenExpired => "REFRESH_TOKEN_EXPIRED",
            AuthError::TokenRevoked => "REFRESH_TOKEN_REVOKED",
            AuthError::InvalidToken => "REFRESH_TOKEN_INVALID",
            AuthError::SigningFailure(_) => "SIGNING_FAILURE",
            AuthError::HashFailure(_) => "HASH_FAILURE",
            AuthError::EntropyFailure(_) => "ENTROPY_FAILURE",
            AuthError::Configuration(_) => "CONFIGURATION_ERROR",
            AuthError::ResetForbidden => "FORBIDDEN",
            AuthError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the failure is the caller's fault rather than the server's
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::SigningFailure(_)
                | AuthError::HashFailure(_)
                | AuthError::EntropyFailure(_)
                | AuthError::Configuration(_)
                | AuthError::Storage(_)
        )
    }
}
