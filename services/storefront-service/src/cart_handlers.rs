use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use shop_auth::Identity;

use crate::api_error::{not_found_on_missing_reference, ApiError};
use crate::AppState;

/// A cart line joined with the product it refers to. Rows for products that
/// were deleted disappear with them (FK cascade), so the join is inner.
#[derive(Debug, Serialize, FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub image: Option<String>,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct AddToCart {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}

/// The cart belongs to whoever the session resolves to; any role may hold
/// one. An empty cart is an empty list, never a 404.
pub async fn get_cart(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let lines = load_cart(&state, identity.id()).await?;
    Ok(Json(lines))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<AddToCart>,
) -> Result<(StatusCode, Json<Vec<CartLine>>), ApiError> {
    if body.quantity < 1 {
        return Err(ApiError::validation("quantity must be at least 1"));
    }

    // Re-adding a product merges quantities instead of duplicating the
    // line. The FK violation doubles as the existence check, so a product
    // deleted mid-request still comes back as a 404 rather than a 500.
    sqlx::query(
        "INSERT INTO cart_items (account_id, product_id, quantity)
         VALUES ($1, $2, $3)
         ON CONFLICT (account_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(identity.id())
    .bind(body.product_id)
    .bind(body.quantity)
    .execute(&state.db)
    .await
    .map_err(|err| not_found_on_missing_reference(err, "product_not_found"))?;

    let lines = load_cart(&state, identity.id()).await?;
    Ok((StatusCode::CREATED, Json(lines)))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
    Json(body): Json<UpdateQuantity>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    if body.quantity < 1 {
        return Err(ApiError::validation(
            "quantity must be at least 1; delete the item to remove it",
        ));
    }

    let result = sqlx::query(
        "UPDATE cart_items SET quantity = $3 WHERE account_id = $1 AND product_id = $2",
    )
    .bind(identity.id())
    .bind(product_id)
    .bind(body.quantity)
    .execute(&state.db)
    .await
    .map_err(ApiError::internal)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("cart_item_not_found"));
    }

    let lines = load_cart(&state, identity.id()).await?;
    Ok(Json(lines))
}

/// Removing an absent line is a no-op; the response is the (possibly
/// unchanged) cart either way.
pub async fn remove_cart_item(
    State(state): State<AppState>,
    identity: Identity,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    sqlx::query("DELETE FROM cart_items WHERE account_id = $1 AND product_id = $2")
        .bind(identity.id())
        .bind(product_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    let lines = load_cart(&state, identity.id()).await?;
    Ok(Json(lines))
}

async fn load_cart(state: &AppState, account_id: Uuid) -> Result<Vec<CartLine>, ApiError> {
    sqlx::query_as::<_, CartLine>(
        "SELECT c.product_id, p.name, p.price, p.image, c.quantity, c.added_at
         FROM cart_items c
         JOIN products p ON p.id = c.product_id
         WHERE c.account_id = $1
         ORDER BY c.added_at DESC",
    )
    .bind(account_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)
}
