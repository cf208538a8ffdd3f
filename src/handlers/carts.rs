//! Cart and cart item handlers.

use super::{parse_body, parse_id, parse_uuid};
use crate::config::rules;
use crate::error::AppError;
use crate::extractors::{Json, MaybeUser};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::carts::{AddItemInput, Cart, CartItem, CartRow, UpdateItemInput};
use crate::service::CartService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;

async fn load(state: &AppState, user: &MaybeUser, cart_id: &str) -> Result<CartRow, AppError> {
    let cart_id = parse_uuid(cart_id)?;
    CartService::get_authorized(&state.pool, cart_id, user.0.as_ref()).await
}

fn item_not_found(item_id: i64) -> AppError {
    AppError::NotFound(format!("cart item {}", item_id))
}

pub async fn create(State(state): State<AppState>, user: MaybeUser) -> Result<impl IntoResponse, AppError> {
    let owner = user.0.as_ref().map(|c| c.user_id);
    let row = CartService::create(&state.pool, owner).await?;
    Ok(success_one(Cart::assemble(row, Vec::new())))
}

pub async fn read(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(cart_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let items = CartService::items(&state.pool, cart.id).await?;
    Ok(success_one_ok(Cart::assemble(cart, items)))
}

pub async fn delete(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(cart_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    CartService::delete(&state.pool, cart.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_items(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(cart_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let items: Vec<CartItem> = CartService::items(&state.pool, cart.id)
        .await?
        .into_iter()
        .map(CartItem::from)
        .collect();
    Ok(success_many(items))
}

pub async fn add_item(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(cart_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let input: AddItemInput = parse_body(body, &rules::cart_item_add())?;
    let item = CartService::add_item(&state.pool, cart.id, input).await?;
    Ok(success_one(CartItem::from(item)))
}

pub async fn read_item(
    State(state): State<AppState>,
    user: MaybeUser,
    Path((cart_id, item_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let item_id = parse_id(&item_id)?;
    let item = CartService::item(&state.pool, cart.id, item_id)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(success_one_ok(CartItem::from(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    user: MaybeUser,
    Path((cart_id, item_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let item_id = parse_id(&item_id)?;
    let input: UpdateItemInput = parse_body(body, &rules::cart_item_update())?;
    let item = CartService::update_item(&state.pool, cart.id, item_id, input)
        .await?
        .ok_or_else(|| item_not_found(item_id))?;
    Ok(success_one_ok(CartItem::from(item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    user: MaybeUser,
    Path((cart_id, item_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let cart = load(&state, &user, &cart_id).await?;
    let item_id = parse_id(&item_id)?;
    if !CartService::delete_item(&state.pool, cart.id, item_id).await? {
        return Err(item_not_found(item_id));
    }
    Ok(StatusCode::NO_CONTENT)
}
