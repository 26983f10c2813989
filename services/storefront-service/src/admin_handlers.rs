use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use uuid::Uuid;

use shop_auth::{ensure_role, Identity, Role};

use crate::account_handlers::AccountResponse;
use crate::product_handlers::Product;
use crate::AppState;
use crate::api_error::ApiError;

pub async fn admin_list_accounts(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    ensure_role(&identity, &[Role::Admin])?;

    let rows = sqlx::query_as::<_, crate::account_handlers::AccountRow>(
        "SELECT id, username, email, role, created_at FROM accounts ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)?;

    rows.into_iter()
        .map(AccountResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Deleting an account cascades to its products and cart rows; any token it
/// still holds dies at the next request because the session re-check no
/// longer finds the account.
pub async fn admin_delete_account(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_role(&identity, &[Role::Admin])?;

    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("account_not_found"));
    }

    info!(account_id = %id, admin_id = %identity.id(), "account deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_list_products(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Product>>, ApiError> {
    ensure_role(&identity, &[Role::Admin])?;

    let products = sqlx::query_as::<_, Product>(
        "SELECT id, seller_id, category_id, name, description, price, stock, image, created_at
         FROM products ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)?;
    Ok(Json(products))
}

/// Admins may remove any product regardless of who listed it.
pub async fn admin_delete_product(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    ensure_role(&identity, &[Role::Admin])?;

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("product_not_found"));
    }

    state.metrics.product_mutation("deleted");
    info!(product_id = %id, admin_id = %identity.id(), "product removed by admin");
    Ok(StatusCode::NO_CONTENT)
}
