//! Session JWT authentication for API routes.
//!
//! `RequireAuth` rejects requests without a valid session token;
//! `MaybeAuth` lets anonymous requests through but still rejects a
//! malformed or expired token.
//!
//! # Usage
//!
//! ```rust,ignore
//! use foodgram_services::users::session_auth::RequireAuth;
//!
//! async fn protected_handler(auth: RequireAuth) -> impl IntoResponse {
//!     format!("Hello, user {}!", auth.user_id())
//! }
//! ```
//!
//! Tokens are issued by `POST /api/auth/token/login/` and sent back as
//! `Authorization: Bearer <token>` or `Authorization: Token <token>`.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::token::{SessionClaims, validate_session_token};
use crate::config::Config;

/// Authenticated user extracted from a valid session JWT.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    user_id: i64,
    claims: SessionClaims,
}

impl RequireAuth {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn issued_at(&self) -> i64 {
        self.claims.iat
    }

    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.claims
    }
}

/// Optional authentication: `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeAuth(pub Option<RequireAuth>);

impl MaybeAuth {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(RequireAuth::user_id)
    }
}

/// Error type for session authentication failures.
#[derive(Debug, Serialize)]
pub struct SessionAuthError {
    pub error: String,
    pub message: String,
}

impl SessionAuthError {
    fn missing_token() -> Self {
        Self {
            error: "unauthorized".to_owned(),
            message: "Authentication credentials were not provided.".to_owned(),
        }
    }

    fn invalid_format() -> Self {
        Self {
            error: "unauthorized".to_owned(),
            message: "Authorization header must be `Bearer <token>` or `Token <token>`".to_owned(),
        }
    }

    fn invalid_token(reason: impl Into<String>) -> Self {
        Self {
            error: "unauthorized".to_owned(),
            message: reason.into(),
        }
    }

    fn missing_config() -> Self {
        Self {
            error: "internal_error".to_owned(),
            message: "Server configuration error".to_owned(),
        }
    }
}

impl IntoResponse for SessionAuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Extract the token from `Bearer <token>` or `Token <token>`.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let header_str = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header_str
        .strip_prefix("Bearer ")
        .or_else(|| header_str.strip_prefix("Token "))?
        .trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn authenticate(parts: &Parts) -> Result<RequireAuth, SessionAuthError> {
    let config = parts
        .extensions
        .get::<Config>()
        .ok_or_else(SessionAuthError::missing_config)?;

    let token = extract_token(&parts.headers).ok_or_else(|| {
        if parts.headers.contains_key(AUTHORIZATION) {
            SessionAuthError::invalid_format()
        } else {
            SessionAuthError::missing_token()
        }
    })?;

    let claims = validate_session_token(token, config.jwt_secret())
        .map_err(|e| SessionAuthError::invalid_token(e.to_string()))?;
    let user_id = claims
        .user_id()
        .map_err(|e| SessionAuthError::invalid_token(e.to_string()))?;

    Ok(RequireAuth { user_id, claims })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts)
    }
}

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: Send + Sync,
{
    type Rejection = SessionAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Self(None));
        }
        authenticate(parts).map(|auth| Self(Some(auth)))
    }
}
