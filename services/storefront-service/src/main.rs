use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shop_auth::{AccountStore, TokenCodec};
use storefront_service::app::{router, AppState};
use storefront_service::config::load_app_config;
use storefront_service::metrics::ApiMetrics;
use storefront_service::store::PgAccountStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_app_config().context("loading configuration")?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connecting to postgres")?;

    let codec = Arc::new(TokenCodec::new(config.session.clone()));
    let accounts: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(db.clone()));
    let metrics = Arc::new(ApiMetrics::new().context("registering metrics")?);

    let cors = build_cors(&config.cors_origins)?;

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        db,
        codec,
        accounts,
        config: Arc::new(config),
        metrics,
    };

    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "storefront-service listening");
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}

fn build_cors(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let parsed = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("invalid origin '{origin}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
