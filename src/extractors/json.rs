//! JSON body extractor whose rejections render as `AppError`.

use crate::error::AppError;
use async_trait::async_trait;
use axum::extract::{FromRequest, Request};

/// Same as `axum::Json`, except a malformed body or a missing
/// `Content-Type: application/json` is a 400 in the standard error envelope.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Json(value))
    }
}
