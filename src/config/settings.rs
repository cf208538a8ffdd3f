//! Runtime settings read from the environment (after `dotenvy::dotenv()`).

use crate::error::ConfigError;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/store";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    /// Applied to `unit_price` to produce `price_with_tax` (0.10 = 10%).
    pub tax_rate: Decimal,
    pub page_size: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;
        let max_connections = parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), Some(5))?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: format!("must be at least {} bytes", MIN_JWT_SECRET_LEN),
            });
        }
        let jwt_ttl_secs: i64 = parse_or("JWT_TTL_SECS", get("JWT_TTL_SECS"), Some(86_400))?;
        if jwt_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_TTL_SECS",
                reason: "must be positive".into(),
            });
        }

        let tax_rate: Decimal = parse_or("TAX_RATE", get("TAX_RATE"), Some(Decimal::new(10, 2)))?;
        if tax_rate.is_sign_negative() {
            return Err(ConfigError::Invalid {
                key: "TAX_RATE",
                reason: "must not be negative".into(),
            });
        }
        let page_size = parse_or("PAGE_SIZE", get("PAGE_SIZE"), Some(10))?;
        if page_size == 0 || page_size > 100 {
            return Err(ConfigError::Invalid {
                key: "PAGE_SIZE",
                reason: "must be between 1 and 100".into(),
            });
        }

        Ok(Settings {
            database_url,
            bind_addr,
            max_connections,
            jwt_secret,
            jwt_ttl_secs,
            tax_rate,
            page_size,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(s) => s.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}
