/// Authentication module
///
/// Access token issuing/validation, password hashing, refresh token
/// generation, credential extraction, and session orchestration.

mod claims;
mod clock;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod session;

pub use claims::{Claims, ISSUER};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{
    authorize_api_key, extract_api_key, extract_bearer, extract_credential, Credential,
    HeaderSource, API_KEY_SCHEME, AUTHORIZATION, BEARER_SCHEME,
};
pub use jwt::{generate_access_token, validate_access_token, AccessTokenCodec};
pub use password::{hash_password, verify_password};
pub use refresh_token::generate_refresh_token;
pub use session::{LoginSession, SessionManager};
