use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use shop_auth::cookies::{clear_session_cookie, session_cookie};
use shop_auth::{AccountRecord, Identity, Role};

use crate::api_error::{conflict_on_unique, ApiError};
use crate::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_USERNAME_LENGTH: usize = 3;

/// Outbound account shape. The password hash is never serialized.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRecord> for AccountResponse {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            email: record.email,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

#[derive(FromRow)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for AccountResponse {
    type Error = ApiError;

    fn try_from(row: AccountRow) -> Result<Self, ApiError> {
        let role: Role = row.role.parse().map_err(ApiError::internal)?;
        Ok(Self {
            id: row.id,
            username: row.username,
            email: row.email,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AuthRow {
    id: Uuid,
    username: String,
    email: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Optional; defaults to customer. Admin cannot be self-assigned.
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountResponse,
}

#[derive(Deserialize)]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, [(header::HeaderName, HeaderValue); 1], Json<SessionResponse>), ApiError> {
    let username = body.username.trim().to_string();
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ApiError::validation(format!(
            "username must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }
    let email = body.email.trim().to_string();
    if !email.contains('@') {
        return Err(ApiError::validation("email address is not valid"));
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let role = registration_role(body.role.as_deref())?;

    let password_hash = hash_password(&body.password)?;
    let account_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, AccountRow>(
        "INSERT INTO accounts (id, username, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, username, email, role, created_at",
    )
    .bind(account_id)
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(role.as_str())
    .fetch_one(&state.db)
    .await
    .map_err(|err| {
        conflict_on_unique(err, "account_exists", "username or email already registered")
    })?;

    let account = AccountResponse::try_from(row)?;
    let issued = state
        .codec
        .issue(account.id, account.role)
        .map_err(ApiError::internal)?;
    state.metrics.registration(account.role.as_str());
    info!(account_id = %account.id, role = %account.role, "account registered");

    let cookie = set_cookie_header(&state, &issued.token)?;
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            token: issued.token,
            account,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<([(header::HeaderName, HeaderValue); 1], Json<SessionResponse>), ApiError> {
    let row = sqlx::query_as::<_, AuthRow>(
        "SELECT id, username, email, role, password_hash, created_at
         FROM accounts WHERE email = $1",
    )
    .bind(body.email.trim())
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?;

    let Some(row) = row else {
        state.metrics.login_attempt("failure");
        return Err(ApiError::invalid_credentials());
    };

    if !verify_password(&body.password, &row.password_hash) {
        state.metrics.login_attempt("failure");
        return Err(ApiError::invalid_credentials());
    }

    let role: Role = row.role.parse().map_err(ApiError::internal)?;
    let issued = state.codec.issue(row.id, role).map_err(ApiError::internal)?;
    state.metrics.login_attempt("success");
    info!(account_id = %row.id, "login succeeded");

    let cookie = set_cookie_header(&state, &issued.token)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse {
            token: issued.token,
            account: AccountResponse {
                id: row.id,
                username: row.username,
                email: row.email,
                role,
                created_at: row.created_at,
            },
        }),
    ))
}

/// The server holds no session state, so logout is entirely client-side:
/// expire the cookie and let the token age out.
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(StatusCode, [(header::HeaderName, HeaderValue); 1]), ApiError> {
    let cookie = clear_session_cookie(state.codec.config());
    let value = HeaderValue::from_str(&cookie).map_err(ApiError::internal)?;
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, value)]))
}

/// Current account snapshot for the verified session; the identity is
/// re-fetched from the credential store by the extractor, so this reflects
/// live account state rather than token contents.
pub async fn session(identity: Identity) -> Json<AccountResponse> {
    Json(AccountResponse::from(identity.account))
}

pub async fn update_password(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if body.new_password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let current_hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = $1")
            .bind(identity.id())
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::internal)?;
    let current_hash = current_hash.ok_or_else(|| ApiError::not_found("account_not_found"))?;

    if !verify_password(&body.current_password, &current_hash) {
        return Err(ApiError::Unauthorized {
            code: "invalid_credentials",
            message: "Current password is incorrect".to_string(),
        });
    }

    let new_hash = hash_password(&body.new_password)?;
    sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
        .bind(&new_hash)
        .bind(identity.id())
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    Ok(StatusCode::NO_CONTENT)
}

fn registration_role(raw: Option<&str>) -> Result<Role, ApiError> {
    let Some(raw) = raw else {
        return Ok(Role::Customer);
    };
    let role: Role = raw
        .parse()
        .map_err(|_| ApiError::validation(format!("unsupported role '{raw}'")))?;
    if role == Role::Admin {
        return Err(ApiError::validation("role must be customer or seller"));
    }
    Ok(role)
}

fn set_cookie_header(state: &AppState, token: &str) -> Result<HeaderValue, ApiError> {
    let cookie = session_cookie(state.codec.config(), token);
    HeaderValue::from_str(&cookie).map_err(ApiError::internal)
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ApiError::internal)
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
