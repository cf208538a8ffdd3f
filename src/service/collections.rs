//! Collections: named groupings of products.

use crate::error::AppError;
use crate::store::table;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub products_count: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CollectionInput {
    pub title: String,
}

impl CollectionInput {
    pub fn check(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("title may not be blank".into()));
        }
        Ok(self)
    }
}

fn select_sql() -> String {
    format!(
        "SELECT c.id, c.title, (SELECT COUNT(*) FROM {} pc WHERE pc.collection_id = c.id) AS products_count FROM {} c",
        table("product_collections"),
        table("collections")
    )
}

pub struct CollectionService;

impl CollectionService {
    pub async fn list(pool: &PgPool) -> Result<Vec<Collection>, AppError> {
        let sql = format!("{} ORDER BY c.id", select_sql());
        Ok(sqlx::query_as::<_, Collection>(&sql).fetch_all(pool).await?)
    }

    pub async fn read(pool: &PgPool, id: i64) -> Result<Option<Collection>, AppError> {
        let sql = format!("{} WHERE c.id = $1", select_sql());
        Ok(sqlx::query_as::<_, Collection>(&sql).bind(id).fetch_optional(pool).await?)
    }

    pub async fn create(pool: &PgPool, input: CollectionInput) -> Result<Collection, AppError> {
        let sql = format!(
            "INSERT INTO {} (title) VALUES ($1) RETURNING id, title, 0::bigint AS products_count",
            table("collections")
        );
        let row = sqlx::query_as::<_, Collection>(&sql)
            .bind(&input.title)
            .fetch_one(pool)
            .await?;
        tracing::info!(collection_id = row.id, "collection created");
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: i64, input: CollectionInput) -> Result<Option<Collection>, AppError> {
        let sql = format!(
            "UPDATE {} SET title = $2, updated_at = NOW() WHERE id = $1 RETURNING id",
            table("collections")
        );
        let updated: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(&input.title)
            .fetch_optional(pool)
            .await?;
        match updated {
            Some(id) => Self::read(pool, id).await,
            None => Ok(None),
        }
    }

    /// Delete unless the collection still includes products.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            table("collections")
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("collection {}", id)));
        }
        let products: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE collection_id = $1",
            table("product_collections")
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if products > 0 {
            return Err(AppError::MethodNotAllowed(
                "Collection cannot be deleted because it includes one or more products.".into(),
            ));
        }
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("collections")))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(collection_id = id, "collection deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_is_rejected() {
        let err = CollectionInput { title: "   ".into() }.check().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let ok = CollectionInput { title: " Teas ".into() }.check().unwrap();
        assert_eq!(ok.title, "Teas");
    }

    #[test]
    fn select_counts_linked_products() {
        let sql = select_sql();
        assert!(sql.contains("COUNT(*)"));
        assert!(sql.contains("pc.collection_id = c.id"));
    }
}
