use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// Verified session assertion: one canonical subject, one canonical role.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub subject: Uuid,
    pub role: Role,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Raw token payload as it appears on the wire.
///
/// Earlier token generations duplicated the subject under `userId` and `id`
/// and the role under `userType`. This repr is the only place those aliases
/// are accepted; canonical `sub`/`role` win when both are present, and
/// everything downstream sees [`Claims`] only.
#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default, rename = "userId")]
    legacy_user_id: Option<String>,
    #[serde(default, rename = "id")]
    legacy_id: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "userType")]
    legacy_user_type: Option<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let raw_subject = value
            .sub
            .or(value.legacy_user_id)
            .or(value.legacy_id)
            .ok_or(AuthError::InvalidClaim("sub", "<missing>".to_string()))?;
        let subject = Uuid::parse_str(&raw_subject)
            .map_err(|_| AuthError::InvalidClaim("sub", raw_subject.clone()))?;

        let raw_role = value
            .role
            .or(value.legacy_user_type)
            .ok_or(AuthError::InvalidClaim("role", "<missing>".to_string()))?;
        let role = raw_role
            .parse::<Role>()
            .map_err(|_| AuthError::InvalidClaim("role", raw_role.clone()))?;

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            subject,
            role,
            issued_at,
            expires_at,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value)
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        Claims::try_from(repr)
    }
}
