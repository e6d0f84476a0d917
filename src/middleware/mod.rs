/// Middleware module
///
/// Request guards that put the auth core in front of actix-web handlers.

mod auth_middleware;
mod response;

pub use auth_middleware::{Authentication, AuthenticatedUser};
pub use response::ErrorResponse;
