//! Registration, login and role management.

use super::{parse_body, parse_id};
use crate::auth::Role;
use crate::config::rules;
use crate::error::{AppError, AuthError};
use crate::extractors::{AdminUser, CurrentUser, Json};
use crate::response::{success_one, success_one_ok};
use crate::service::users::{LoginInput, RegisterInput, User};
use crate::service::UserService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Deserialize)]
struct RoleInput {
    role: String,
}

pub async fn register(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let input: RegisterInput = parse_body(body, &rules::register())?;
    Ok(success_one(UserService::register(&state.pool, input).await?))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, AppError> {
    let input: LoginInput = parse_body(body, &rules::login())?;
    let user = UserService::authenticate(&state.pool, input).await?;
    let issued = state.keys.issue(user.id, user.role)?;
    tracing::info!(user_id = user.id, "login");
    Ok(success_one_ok(LoginResponse {
        token: issued.token,
        token_type: issued.token_type,
        expires_in: issued.expires_in,
        user,
    }))
}

pub async fn me(State(state): State<AppState>, CurrentUser(caller): CurrentUser) -> Result<impl IntoResponse, AppError> {
    let user = UserService::get(&state.pool, caller.user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;
    Ok(success_one_ok(user))
}

pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    let input: RoleInput = parse_body(body, &rules::role_update())?;
    let role: Role = input.role.parse()?;
    let user = UserService::set_role(&state.pool, id, role)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", id)))?;
    Ok(success_one_ok(user))
}
