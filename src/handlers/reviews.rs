//! Review handlers, nested under `/products/:product_id/reviews`.

use super::{parse_body, parse_id, parse_patch};
use crate::config::rules;
use crate::error::{AppError, AuthError};
use crate::extractors::{CurrentUser, Json};
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::reviews::{can_modify, Review, ReviewInput, ReviewPatch};
use crate::service::{ReviewService, UserService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use sqlx::PgPool;

async fn find(pool: &PgPool, product_id: &str, review_id: &str) -> Result<Review, AppError> {
    let product_id = parse_id(product_id)?;
    let review_id = parse_id(review_id)?;
    ReviewService::read(pool, product_id, review_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {}", review_id)))
}

fn ensure_can_modify(review: &Review, user: &CurrentUser) -> Result<(), AppError> {
    if !can_modify(review, &user.0) {
        return Err(AppError::Forbidden("only the author or an admin may change this review".into()));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let product_id = parse_id(&product_id)?;
    Ok(success_many(ReviewService::list(&state.pool, product_id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(product_id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let product_id = parse_id(&product_id)?;
    let input: ReviewInput = parse_body(body, &rules::review())?;
    let input = input.check()?;
    let author = UserService::get(&state.pool, user.0.user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;
    let review = ReviewService::create(&state.pool, product_id, author.id, &author.display_name(), input).await?;
    Ok(success_one(review))
}

pub async fn read(
    State(state): State<AppState>,
    Path((product_id, review_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(find(&state.pool, &product_id, &review_id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((product_id, review_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let review = find(&state.pool, &product_id, &review_id).await?;
    ensure_can_modify(&review, &user)?;
    let patch: ReviewPatch = parse_patch(body, &rules::review())?;
    Ok(success_one_ok(ReviewService::update(&state.pool, &review, patch.check()?).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((product_id, review_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let review = find(&state.pool, &product_id, &review_id).await?;
    ensure_can_modify(&review, &user)?;
    ReviewService::delete(&state.pool, &review).await?;
    Ok(StatusCode::NO_CONTENT)
}
