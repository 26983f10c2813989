use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

use shop_auth::{ensure_role, Identity, Role};

use crate::api_error::{conflict_on_unique, ApiError};
use crate::AppState;

#[derive(Debug, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct NewCategory {
    pub name: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, created_at FROM categories ORDER BY name",
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::internal)?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    ensure_role(&identity, &[Role::Admin])?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("category name must not be empty"));
    }

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .fetch_one(&state.db)
    .await
    .map_err(|err| conflict_on_unique(err, "category_exists", "category already exists"))?;

    info!(category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}
