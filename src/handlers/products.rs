//! Product catalog handlers.

use super::{parse_body, parse_id, parse_patch};
use crate::config::rules;
use crate::error::AppError;
use crate::extractors::{AdminUser, Json};
use crate::response::{last_page, success_one, success_one_ok, success_page, MetaPage};
use crate::service::products::{Product, ProductInput, ProductPatch};
use crate::service::{ProductFilter, ProductService};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use std::collections::HashMap;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductFilter::from_params(&params)?;
    let page_size = state.settings.page_size;
    let (rows, count) = ProductService::list(&state.pool, &filter, page_size).await?;
    if filter.page > last_page(count, page_size) {
        return Err(AppError::NotFound("invalid page".into()));
    }
    let tax = state.settings.tax_rate;
    let data: Vec<Product> = rows.into_iter().map(|r| Product::from_row(r, tax)).collect();
    Ok(success_page(data, MetaPage::new(count, filter.page, page_size)))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input: ProductInput = parse_body(body, &rules::product())?;
    let row = ProductService::create(&state.pool, input.check()?).await?;
    Ok(success_one(Product::from_row(row, state.settings.tax_rate)))
}

pub async fn read(State(state): State<AppState>, Path(id): Path<String>) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let row = ProductService::read(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;
    Ok(success_one_ok(Product::from_row(row, state.settings.tax_rate)))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let patch: ProductPatch = parse_patch(body, &rules::product())?;
    let row = ProductService::update(&state.pool, id, patch.check()?)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {}", id)))?;
    Ok(success_one_ok(Product::from_row(row, state.settings.tax_rate)))
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    ProductService::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
