//! Order handlers.

use super::{parse_body, parse_id};
use crate::config::rules;
use crate::error::AppError;
use crate::extractors::{AdminUser, CurrentUser, Json};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::orders::{CreateOrderInput, UpdateOrderInput};
use crate::service::OrderService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input: CreateOrderInput = parse_body(body, &rules::order_create())?;
    let order = OrderService::create_from_cart(&state.pool, &caller, input.cart_id).await?;
    Ok(success_one(order))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(OrderService::list(&state.pool, &caller).await?))
}

pub async fn read(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    Ok(success_one_ok(OrderService::get(&state.pool, &caller, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let input: UpdateOrderInput = parse_body(body, &rules::order_update())?;
    let order = OrderService::update_status(&state.pool, id, input.payment_status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;
    Ok(success_one_ok(order))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    if !OrderService::delete(&state.pool, id).await? {
        return Err(AppError::NotFound(format!("order {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
