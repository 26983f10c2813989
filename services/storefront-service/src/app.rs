use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::PgPool;

use shop_auth::{AccountStore, TokenCodec};

use crate::account_handlers::{login, logout, register, session, update_password};
use crate::admin_handlers::{
    admin_delete_account, admin_delete_product, admin_list_accounts, admin_list_products,
};
use crate::api_error::ApiError;
use crate::cart_handlers::{add_to_cart, get_cart, remove_cart_item, update_cart_item};
use crate::category_handlers::{create_category, list_categories};
use crate::config::AppConfig;
use crate::metrics::ApiMetrics;
use crate::product_handlers::{
    create_product, delete_product, get_product, list_products, seller_products, update_product,
};

/// Shared application state. Everything the session extractor and the
/// handlers need is constructed once in main and injected here; nothing is
/// read from ambient globals after startup.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub codec: Arc<TokenCodec>,
    pub accounts: Arc<dyn AccountStore>,
    pub config: Arc<AppConfig>,
    pub metrics: Arc<ApiMetrics>,
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl FromRef<AppState> for Arc<dyn AccountStore> {
    fn from_ref(state: &AppState) -> Self {
        state.accounts.clone()
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn render_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.metrics.render().map_err(ApiError::internal)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(render_metrics))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/auth/password", put(update_password))
        .route("/products", get(list_products).post(create_product))
        .route("/products/seller", get(seller_products))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route("/cart", get(get_cart).post(add_to_cart))
        .route(
            "/cart/:product_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/admin/accounts", get(admin_list_accounts))
        .route("/admin/accounts/:id", axum::routing::delete(admin_delete_account))
        .route("/admin/products", get(admin_list_products))
        .route("/admin/products/:id", axum::routing::delete(admin_delete_product))
        .with_state(state)
}
