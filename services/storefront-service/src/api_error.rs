use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shop_auth::GuardError;

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Service-level errors with stable machine codes. Auth failures are not
/// represented here; the `Identity` extractor rejects those itself with a
/// single generic 401.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: String },
    Unauthorized { code: &'static str, message: String },
    Forbidden,
    NotFound { code: &'static str },
    Conflict { code: &'static str, message: String },
    Internal,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "validation",
            message: message.into(),
        }
    }

    /// The same body for an unknown address and a wrong password, so login
    /// cannot be used to enumerate accounts.
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized {
            code: "invalid_credentials",
            message: "Invalid credentials. Please try again.".to_string(),
        }
    }

    pub fn not_found(code: &'static str) -> Self {
        ApiError::NotFound { code }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Log the real error, return a detail-free 500.
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        tracing::error!(error = %err, "internal error while handling request");
        ApiError::Internal
    }
}

/// Map a sqlx unique-constraint violation to a conflict; anything else is
/// an internal error.
pub fn conflict_on_unique(err: sqlx::Error, code: &'static str, message: &str) -> ApiError {
    if has_db_error_code(&err, "23505") {
        return ApiError::conflict(code, message);
    }
    ApiError::internal(err)
}

/// Map a sqlx foreign-key violation to a 404 on the referenced resource.
/// Lets writes that reference another row rely on the constraint instead of
/// a racy existence pre-check.
pub fn not_found_on_missing_reference(err: sqlx::Error, code: &'static str) -> ApiError {
    if has_db_error_code(&err, "23503") {
        return ApiError::not_found(code);
    }
    ApiError::internal(err)
}

fn has_db_error_code(err: &sqlx::Error, code: &str) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(code))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest { code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code,
                    message: Some(message),
                },
            ),
            ApiError::Unauthorized { code, message } => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code,
                    message: Some(message),
                },
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "forbidden",
                    message: None,
                },
            ),
            ApiError::NotFound { code } => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code,
                    message: None,
                },
            ),
            ApiError::Conflict { code, message } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code,
                    message: Some(message),
                },
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "internal_error",
                    message: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<GuardError> for ApiError {
    fn from(err: GuardError) -> Self {
        tracing::warn!(?err, "authorization gate rejected request");
        ApiError::Forbidden
    }
}

impl From<shop_auth::AuthError> for ApiError {
    fn from(err: shop_auth::AuthError) -> Self {
        tracing::warn!(reason = %err, "authentication failure inside handler");
        ApiError::Unauthorized {
            code: "unauthenticated",
            message: "Not authorized".to_string(),
        }
    }
}
