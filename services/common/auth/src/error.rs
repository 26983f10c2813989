use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub type AuthResult<T> = Result<T, AuthError>;

/// Internal reasons a request can fail to produce an identity. These are
/// kept distinct for diagnostics but all render as the same generic 401 so
/// clients cannot distinguish malformed, expired, and orphaned tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session cookie or bearer token present")]
    MissingCredentials,
    #[error("authorization header malformed")]
    InvalidAuthorization,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error("token verification failed: {0}")]
    Verification(String),
    #[error("token expired")]
    Expired,
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("account referenced by token no longer exists")]
    AccountGone,
    #[error("credential store lookup failed: {0}")]
    Store(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // The internal reason is logged, never surfaced.
        warn!(reason = %self, "request authentication failed");
        let body = ErrorBody {
            code: "unauthenticated",
            message: "Not authorized",
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl From<crate::store::StoreError> for AuthError {
    fn from(value: crate::store::StoreError) -> Self {
        Self::Store(value.to_string())
    }
}
