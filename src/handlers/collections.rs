//! Collection handlers.

use super::{parse_body, parse_id};
use crate::config::rules;
use crate::error::AppError;
use crate::extractors::{AdminUser, Json};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::collections::CollectionInput;
use crate::service::CollectionService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(CollectionService::list(&state.pool).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input: CollectionInput = parse_body(body, &rules::collection())?;
    Ok(success_one(CollectionService::create(&state.pool, input.check()?).await?))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let row = CollectionService::read(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("collection {}", id)))?;
    Ok(success_one_ok(row))
}

/// The only writable field is `title`, so PATCH and a full body coincide.
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let input: CollectionInput = parse_body(body, &rules::collection())?;
    let row = CollectionService::update(&state.pool, id, input.check()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("collection {}", id)))?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    CollectionService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
