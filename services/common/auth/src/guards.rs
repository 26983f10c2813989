use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::extractors::Identity;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    RoleRequired { required: Vec<Role> },
    NotOwner,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    required: Option<Vec<Role>>,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let body = match self {
            GuardError::RoleRequired { required } => ErrorBody {
                code: "forbidden",
                required: Some(required),
            },
            GuardError::NotOwner => ErrorBody {
                code: "forbidden",
                required: None,
            },
        };
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    }
}

/// Route-level gate. An empty requirement admits any authenticated
/// identity; otherwise the live role must be a member of `allowed`.
/// Membership is exact: admin does not implicitly satisfy other roles.
pub fn ensure_role(identity: &Identity, allowed: &[Role]) -> Result<(), GuardError> {
    if allowed.is_empty() || allowed.contains(&identity.role()) {
        return Ok(());
    }

    warn!(
        account_id = %identity.id(),
        role = %identity.role(),
        ?allowed,
        "role check failed"
    );
    Err(GuardError::RoleRequired {
        required: allowed.to_vec(),
    })
}

/// Ownership gate for mutating a resource that records an owning account.
/// Admin holds the explicit override. Call this after fetching the resource
/// so a missing resource stays NotFound rather than Forbidden.
pub fn ensure_owner(identity: &Identity, owner: Uuid) -> Result<(), GuardError> {
    if identity.id() == owner || identity.role() == Role::Admin {
        return Ok(());
    }

    warn!(
        account_id = %identity.id(),
        resource_owner = %owner,
        "ownership check failed"
    );
    Err(GuardError::NotOwner)
}
