//! Shared application state for all routes.

use crate::auth::TokenKeys;
use crate::config::Settings;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub settings: Arc<Settings>,
    pub keys: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(pool: PgPool, settings: Settings) -> Self {
        let keys = TokenKeys::from_secret(settings.jwt_secret.as_bytes(), settings.jwt_ttl_secs);
        AppState {
            pool,
            settings: Arc::new(settings),
            keys: Arc::new(keys),
        }
    }
}
