//! Product reviews. Anyone may read; authors and admins may change or remove.

use crate::auth::Caller;
use crate::error::AppError;
use crate::store::table;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub rating: i16,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReviewPatch {
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn check_rating(r: i16) -> Result<(), AppError> {
    if !(1..=5).contains(&r) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

impl ReviewInput {
    pub fn check(mut self) -> Result<Self, AppError> {
        check_rating(self.rating)?;
        self.description = self.description.trim().to_string();
        if self.description.is_empty() {
            return Err(AppError::Validation("description may not be blank".into()));
        }
        self.name = self.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        Ok(self)
    }
}

impl ReviewPatch {
    pub fn check(self) -> Result<Self, AppError> {
        if let Some(r) = self.rating {
            check_rating(r)?;
        }
        if self.description.as_deref().map(|d| d.trim().is_empty()).unwrap_or(false) {
            return Err(AppError::Validation("description may not be blank".into()));
        }
        if self.name.as_deref().map(|n| n.trim().is_empty()).unwrap_or(false) {
            return Err(AppError::Validation("name may not be blank".into()));
        }
        Ok(self)
    }
}

/// Authors may edit their own reviews; admins may edit any.
pub fn can_modify(review: &Review, caller: &Caller) -> bool {
    caller.is_admin() || review.user_id == Some(caller.user_id)
}

const COLUMNS: &str = "id, product_id, user_id, name, description, rating, date";

pub struct ReviewService;

impl ReviewService {
    async fn ensure_product(pool: &PgPool, product_id: i64) -> Result<(), AppError> {
        let exists: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE id = $1", table("products")))
            .bind(product_id)
            .fetch_optional(pool)
            .await?;
        exists
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("product {}", product_id)))
    }

    pub async fn list(pool: &PgPool, product_id: i64) -> Result<Vec<Review>, AppError> {
        Self::ensure_product(pool, product_id).await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE product_id = $1 ORDER BY date DESC, id DESC",
            COLUMNS,
            table("reviews")
        );
        Ok(sqlx::query_as::<_, Review>(&sql).bind(product_id).fetch_all(pool).await?)
    }

    pub async fn read(pool: &PgPool, product_id: i64, review_id: i64) -> Result<Option<Review>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE product_id = $1 AND id = $2",
            COLUMNS,
            table("reviews")
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .bind(review_id)
            .fetch_optional(pool)
            .await?)
    }

    /// Create a review for `product_id` authored by `user_id`; `name` falls back to `display_name`.
    pub async fn create(
        pool: &PgPool,
        product_id: i64,
        user_id: i64,
        display_name: &str,
        input: ReviewInput,
    ) -> Result<Review, AppError> {
        Self::ensure_product(pool, product_id).await?;
        let name = input.name.as_deref().unwrap_or(display_name);
        let sql = format!(
            "INSERT INTO {} (product_id, user_id, name, description, rating) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            table("reviews"),
            COLUMNS
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(product_id)
            .bind(user_id)
            .bind(name)
            .bind(&input.description)
            .bind(input.rating)
            .fetch_one(pool)
            .await?;
        tracing::info!(product_id, review_id = review.id, "review posted");
        Ok(review)
    }

    pub async fn update(pool: &PgPool, review: &Review, patch: ReviewPatch) -> Result<Review, AppError> {
        let sql = format!(
            "UPDATE {} SET rating = COALESCE($2, rating), name = COALESCE($3, name), \
             description = COALESCE($4, description) WHERE id = $1 RETURNING {}",
            table("reviews"),
            COLUMNS
        );
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(review.id)
            .bind(patch.rating)
            .bind(patch.name.as_deref().map(str::trim))
            .bind(patch.description.as_deref().map(str::trim))
            .fetch_one(pool)
            .await?)
    }

    pub async fn delete(pool: &PgPool, review: &Review) -> Result<(), AppError> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("reviews")))
            .bind(review.id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn review(author: Option<i64>) -> Review {
        Review {
            id: 1,
            product_id: 1,
            user_id: author,
            name: "Ada".into(),
            description: "Lovely".into(),
            rating: 5,
            date: Utc::now(),
        }
    }

    #[test]
    fn author_and_admin_may_modify() {
        let author = Caller { user_id: 7, role: Role::Customer };
        let other = Caller { user_id: 8, role: Role::Customer };
        let admin = Caller { user_id: 9, role: Role::Admin };
        assert!(can_modify(&review(Some(7)), &author));
        assert!(!can_modify(&review(Some(7)), &other));
        assert!(can_modify(&review(Some(7)), &admin));
        assert!(!can_modify(&review(None), &author));
    }

    #[test]
    fn rating_outside_range_is_rejected() {
        for rating in [0, 6, -1] {
            let input = ReviewInput { rating, name: None, description: "ok".into() };
            assert!(input.check().is_err());
        }
    }

    #[test]
    fn blank_name_falls_back() {
        let input = ReviewInput { rating: 4, name: Some("  ".into()), description: " fine ".into() }
            .check()
            .unwrap();
        assert_eq!(input.name, None);
        assert_eq!(input.description, "fine");
    }

    #[test]
    fn patch_rejects_blank_description() {
        let patch = ReviewPatch { description: Some(" ".into()), ..Default::default() };
        assert!(patch.check().is_err());
        ReviewPatch { rating: Some(3), ..Default::default() }.check().unwrap();
    }
}
