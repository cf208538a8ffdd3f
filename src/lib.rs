//! Store API: catalog, collections, carts, reviews, orders and role-based auth over PostgreSQL.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod service;
pub mod slug;
pub mod sql;
pub mod state;
pub mod store;

pub use config::Settings;
pub use error::{AppError, AuthError, ConfigError};
pub use migration::apply_migrations;
pub use response::{success_many, success_one};
pub use routes::{common_routes, common_routes_with_ready, store_routes};
pub use state::AppState;
pub use store::ensure_database_exists;

use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Full application router: common routes at `/`, the store API at `/api/v1`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api/v1", store_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
