//! Authentication and session tokens for the chirpy service.
//!
//! Short-lived HS256 access tokens, long-lived opaque refresh tokens stored
//! through an [`store::AuthStore`], bcrypt password hashing, and an actix-web
//! guard for protected routes.

pub mod auth;
pub mod configuration;
pub mod error;
pub mod middleware;
pub mod store;
pub mod telemetry;

pub use error::{AuthError, StoreError};
