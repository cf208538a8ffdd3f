//! HTTP handlers for the store API.

pub mod auth;
pub mod carts;
pub mod collections;
pub mod orders;
pub mod products;
pub mod reviews;

use crate::config::RuleSet;
use crate::error::AppError;
use crate::service::RequestValidator;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

pub(crate) fn parse_id(s: &str) -> Result<i64, AppError> {
    s.parse().map_err(|_| AppError::BadRequest("invalid id".into()))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s).map_err(|_| AppError::BadRequest("invalid uuid".into()))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn decode<T: DeserializeOwned>(body: Map<String, Value>) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(body)).map_err(|e| AppError::Validation(e.to_string()))
}

/// Validate a full create body against `rules` and decode it.
pub(crate) fn parse_body<T: DeserializeOwned>(value: Value, rules: &RuleSet) -> Result<T, AppError> {
    let body = body_to_map(value)?;
    RequestValidator::validate(&body, rules)?;
    decode(body)
}

/// Validate a PATCH body: only present fields are checked, and at least one is required.
pub(crate) fn parse_patch<T: DeserializeOwned>(value: Value, rules: &RuleSet) -> Result<T, AppError> {
    let body = body_to_map(value)?;
    if body.is_empty() {
        return Err(AppError::Validation("no fields to update".into()));
    }
    RequestValidator::validate_partial(&body, rules)?;
    decode(body)
}
