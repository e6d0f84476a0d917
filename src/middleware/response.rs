/// HTTP mapping for `AuthError`
///
/// The auth core is transport-agnostic; this is where its errors meet
/// actix-web. Credential and token failures become 401, the refused reset
/// becomes 403, and internal failures become 500 without leaking detail.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::error::AuthError;

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub error: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, error: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            error,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::ResetForbidden => StatusCode::FORBIDDEN,
            e if e.is_client_error() => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        let status = self.status_code();

        let message = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error_id = %error_id, error = %self, "Internal authentication error");
            "Internal server error".to_string()
        };

        HttpResponse::build(status).json(ErrorResponse::new(
            error_id,
            message,
            self.code().to_string(),
            status.as_u16(),
        ))
    }
}
