use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, AuthUser};

/// Attach the caller's identity when the request carries a valid bearer
/// token. Requests without one pass through anonymously; gates decide later
/// whether that is acceptable.
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(user) = identify(request.headers()) {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

fn identify(headers: &HeaderMap) -> Option<AuthUser> {
    let token = match extract_jwt_from_headers(headers) {
        Ok(Some(token)) => token,
        Ok(None) => return None,
        Err(msg) => {
            tracing::debug!("Ignoring Authorization header: {}", msg);
            return None;
        }
    };

    match validate_jwt(token) {
        Ok(claims) => Some(AuthUser::from(claims)),
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {}", e);
            None
        }
    }
}

/// Extract JWT token from Authorization header. `Ok(None)` when absent.
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format")?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token.trim().is_empty() => Err("Empty JWT token"),
        Some(token) => Ok(Some(token.trim())),
        None => Err("Authorization header must use Bearer token format"),
    }
}

/// Identity attached by [`identity_middleware`], if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthUser>);

impl CurrentUser {
    pub fn get(&self) -> Option<&AuthUser> {
        self.0.as_ref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}
