pub mod account_handlers;
pub mod admin_handlers;
pub mod api_error;
pub mod app;
pub mod cart_handlers;
pub mod category_handlers;
pub mod config;
pub mod metrics;
pub mod product_handlers;
pub mod store;

pub use api_error::ApiError;
pub use app::AppState;
