use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use shop_auth::{ensure_owner, ensure_role, Identity, Role};

use crate::api_error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub image: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    pub image: Option<String>,
}

const SELECT_COLUMNS: &str =
    "id, seller_id, category_id, name, description, price, stock, image, created_at";

/// Public catalog listing, newest first.
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {SELECT_COLUMNS} FROM products ORDER BY created_at DESC"
    ))
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = fetch_product(&state, id).await?;
    Ok(Json(product))
}

/// Listing scoped to the authenticated seller's own products.
pub async fn seller_products(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<Product>>, ApiError> {
    ensure_role(&identity, &[Role::Seller])?;
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {SELECT_COLUMNS} FROM products WHERE seller_id = $1 ORDER BY created_at DESC"
    ))
    .bind(identity.id())
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    ensure_role(&identity, &[Role::Seller])?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("product name must not be empty"));
    }
    if body.price < BigDecimal::from(0) {
        return Err(ApiError::validation("price must not be negative"));
    }
    if body.stock < 0 {
        return Err(ApiError::validation("stock must not be negative"));
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (id, seller_id, category_id, name, description, price, stock, image)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(identity.id())
    .bind(body.category_id)
    .bind(&name)
    .bind(&body.description)
    .bind(&body.price)
    .bind(body.stock)
    .bind(&body.image)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::internal)?;

    state.metrics.product_mutation("created");
    info!(product_id = %product.id, seller_id = %identity.id(), "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    // Existence is checked before ownership so a non-owner probing a missing
    // id sees the same 404 as everyone else.
    let existing = fetch_product(&state, id).await?;
    ensure_owner(&identity, existing.seller_id)?;

    if let Some(price) = &body.price {
        if *price < BigDecimal::from(0) {
            return Err(ApiError::validation("price must not be negative"));
        }
    }
    if let Some(stock) = body.stock {
        if stock < 0 {
            return Err(ApiError::validation("stock must not be negative"));
        }
    }
    if let Some(name) = &body.name {
        if name.trim().is_empty() {
            return Err(ApiError::validation("product name must not be empty"));
        }
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            stock = COALESCE($5, stock),
            category_id = COALESCE($6, category_id),
            image = COALESCE($7, image)
         WHERE id = $1
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(id)
    .bind(body.name.as_deref().map(str::trim))
    .bind(&body.description)
    .bind(&body.price)
    .bind(body.stock)
    .bind(body.category_id)
    .bind(&body.image)
    .fetch_one(&state.db)
    .await
    .map_err(ApiError::internal)?;

    state.metrics.product_mutation("updated");
    info!(product_id = %id, account_id = %identity.id(), "product updated");
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let existing = fetch_product(&state, id).await?;
    ensure_owner(&identity, existing.seller_id)?;

    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await
        .map_err(ApiError::internal)?;

    state.metrics.product_mutation("deleted");
    info!(product_id = %id, account_id = %identity.id(), "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_product(state: &AppState, id: Uuid) -> Result<Product, ApiError> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {SELECT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await
    .map_err(ApiError::internal)?
    .ok_or_else(|| ApiError::not_found("product_not_found"))
}
