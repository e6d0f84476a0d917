/// Authentication Middleware
///
/// Checks the Authorization header before a protected handler runs. The
/// bearer policy validates an access token and injects the user into request
/// extensions; the API key policy admits requests carrying the configured
/// administrative key.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{authorize_api_key, extract_bearer, AccessTokenCodec};
use crate::error::AuthError;

/// User resolved from a valid access token
///
/// Handlers behind `Authentication::bearer` read it with
/// `web::ReqData<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

#[derive(Clone)]
enum Policy {
    Bearer(AccessTokenCodec),
    ApiKey(Arc<str>),
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Bearer(codec) => f.debug_tuple("Bearer").field(codec).finish(),
            Policy::ApiKey(_) => f.debug_tuple("ApiKey").field(&"[redacted]").finish(),
        }
    }
}

impl Policy {
    fn check(&self, req: &ServiceRequest) -> Result<Option<AuthenticatedUser>, AuthError> {
        match self {
            Policy::Bearer(codec) => {
                let token = extract_bearer(req.headers())?;
                let user_id = codec.verify(&token)?;
                Ok(Some(AuthenticatedUser(user_id)))
            }
            Policy::ApiKey(key) => {
                authorize_api_key(req.headers(), key)?;
                Ok(None)
            }
        }
    }
}

/// Authentication middleware for protecting routes
#[derive(Clone, Debug)]
pub struct Authentication {
    policy: Policy,
}

impl Authentication {
    /// Require `Authorization: Bearer <access token>`
    pub fn bearer(codec: AccessTokenCodec) -> Self {
        Self {
            policy: Policy::Bearer(codec),
        }
    }

    /// Require `Authorization: ApiKey <key>` matching `key`
    pub fn api_key(key: &str) -> Self {
        Self {
            policy: Policy::ApiKey(Arc::from(key)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthenticationService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthenticationService {
            service: Rc::new(service),
            policy: self.policy.clone(),
        }))
    }
}

pub struct AuthenticationService<S> {
    service: Rc<S>,
    policy: Policy,
}

impl<S, B> Service<ServiceRequest> for AuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.policy.check(&req) {
            Ok(user) => {
                if let Some(user) = user {
                    tracing::debug!(user_id = %user.0, "Access token validated");
                    req.extensions_mut().insert(user);
                }

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), code = e.code(), "Request rejected: {}", e);
                Box::pin(async move { Err(Error::from(e)) })
            }
        }
    }
}
