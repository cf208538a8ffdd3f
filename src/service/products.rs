//! Product catalog: paginated listing, CRUD, collection links and review aggregates.

use crate::error::AppError;
use crate::service::filters::ProductFilter;
use crate::service::pricing::{price_with_tax, round_money};
use crate::slug::slugify;
use crate::sql::{count_products, product_select, select_products, PgBindValue};
use crate::store::table;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{PgConnection, PgPool};

/// Largest value a NUMERIC(6, 2) column holds.
fn max_unit_price() -> Decimal {
    Decimal::new(999_999, 2)
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub inventory: i32,
    pub last_update: DateTime<Utc>,
    pub collection_ids: Vec<i64>,
    pub reviews_count: i64,
    pub average_rating: Option<Decimal>,
}

/// Product as returned by the API.
#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub price_with_tax: Decimal,
    pub inventory: i32,
    pub collection_ids: Vec<i64>,
    pub reviews_count: i64,
    pub average_rating: Option<Decimal>,
    pub last_update: DateTime<Utc>,
}

impl Product {
    pub fn from_row(row: ProductRow, tax_rate: Decimal) -> Self {
        Product {
            price_with_tax: price_with_tax(row.unit_price, tax_rate),
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            unit_price: row.unit_price,
            inventory: row.inventory,
            collection_ids: row.collection_ids,
            reviews_count: row.reviews_count,
            average_rating: row.average_rating,
            last_update: row.last_update,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub inventory: i32,
    pub collection_ids: Vec<i64>,
}

impl ProductInput {
    /// Normalize and check invariants the rule table cannot express. Derives the slug
    /// from the title when none is given.
    pub fn check(mut self) -> Result<Self, AppError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(AppError::Validation("title may not be blank".into()));
        }
        self.unit_price = check_price(self.unit_price)?;
        check_inventory(self.inventory)?;
        self.collection_ids = check_collection_ids(self.collection_ids)?;
        let slug = match self.slug.take() {
            Some(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => slugify(&self.title),
        };
        if slug.is_empty() {
            return Err(AppError::Validation("slug could not be derived from title; provide one".into()));
        }
        self.slug = Some(slug);
        Ok(self)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    /// `Some(None)` is an explicit `null` and clears the description.
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub inventory: Option<i32>,
    #[serde(default)]
    pub collection_ids: Option<Vec<i64>>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

impl ProductPatch {
    pub fn check(mut self) -> Result<Self, AppError> {
        if let Some(ref t) = self.title {
            let t = t.trim().to_string();
            if t.is_empty() {
                return Err(AppError::Validation("title may not be blank".into()));
            }
            self.title = Some(t);
        }
        if let Some(p) = self.unit_price {
            self.unit_price = Some(check_price(p)?);
        }
        if let Some(i) = self.inventory {
            check_inventory(i)?;
        }
        if let Some(ids) = self.collection_ids.take() {
            self.collection_ids = Some(check_collection_ids(ids)?);
        }
        Ok(self)
    }
}

fn check_price(p: Decimal) -> Result<Decimal, AppError> {
    if p < Decimal::ONE {
        return Err(AppError::Validation("unit_price must be at least 1".into()));
    }
    if p > max_unit_price() {
        return Err(AppError::Validation(format!("unit_price must be at most {}", max_unit_price())));
    }
    if p.scale() > 2 && round_money(p) != p.normalize() {
        return Err(AppError::Validation("unit_price must have at most 2 decimal places".into()));
    }
    Ok(round_money(p))
}

fn check_inventory(i: i32) -> Result<(), AppError> {
    if i < 0 {
        return Err(AppError::Validation("inventory must be at least 0".into()));
    }
    Ok(())
}

fn check_collection_ids(mut ids: Vec<i64>) -> Result<Vec<i64>, AppError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::Validation("collection_ids must contain at least one collection".into()));
    }
    Ok(ids)
}

pub struct ProductService;

impl ProductService {
    /// One page of products and the total count of matches.
    pub async fn list(
        pool: &PgPool,
        filter: &ProductFilter,
        page_size: u32,
    ) -> Result<(Vec<ProductRow>, u64), AppError> {
        let c = count_products(filter);
        tracing::debug!(sql = %c.sql, params = ?c.params, "query");
        let mut count_query = sqlx::query_scalar::<_, i64>(&c.sql);
        for p in &c.params {
            count_query = count_query.bind(PgBindValue::from_json(p));
        }
        let count = count_query.fetch_one(pool).await?.max(0) as u64;

        let q = select_products(filter, page_size, filter.offset(page_size));
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_as::<_, ProductRow>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(pool).await?;
        Ok((rows, count))
    }

    pub async fn read(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, AppError> {
        let mut conn = pool.acquire().await?;
        Self::read_with(&mut conn, id).await
    }

    async fn read_with(conn: &mut PgConnection, id: i64) -> Result<Option<ProductRow>, AppError> {
        let sql = format!("{} WHERE p.id = $1", product_select());
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn create(pool: &PgPool, input: ProductInput) -> Result<ProductRow, AppError> {
        let mut tx = pool.begin().await?;
        ensure_collections_exist(&mut tx, &input.collection_ids).await?;
        let sql = format!(
            "INSERT INTO {} (title, slug, description, unit_price, inventory) VALUES ($1, $2, $3, $4, $5) RETURNING id",
            table("products")
        );
        let id: i64 = sqlx::query_scalar(&sql)
            .bind(&input.title)
            .bind(input.slug.as_deref().unwrap_or_default())
            .bind(&input.description)
            .bind(input.unit_price)
            .bind(input.inventory)
            .fetch_one(&mut *tx)
            .await
            .map_err(slug_conflict)?;
        replace_links(&mut tx, id, &input.collection_ids).await?;
        let row = Self::read_with(&mut tx, id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tx.commit().await?;
        tracing::info!(product_id = id, "product created");
        Ok(row)
    }

    pub async fn update(pool: &PgPool, id: i64, patch: ProductPatch) -> Result<Option<ProductRow>, AppError> {
        let mut tx = pool.begin().await?;
        let sql = format!(
            "UPDATE {} SET title = COALESCE($2, title), slug = COALESCE($3, slug), \
             description = CASE WHEN $7 THEN $4 ELSE description END, unit_price = COALESCE($5, unit_price), \
             inventory = COALESCE($6, inventory), last_update = NOW() WHERE id = $1 RETURNING id",
            table("products")
        );
        let updated: Option<i64> = sqlx::query_scalar(&sql)
            .bind(id)
            .bind(&patch.title)
            .bind(&patch.slug)
            .bind(patch.description.clone().flatten())
            .bind(patch.unit_price)
            .bind(patch.inventory)
            .bind(patch.description.is_some())
            .fetch_optional(&mut *tx)
            .await
            .map_err(slug_conflict)?;
        if updated.is_none() {
            return Ok(None);
        }
        if let Some(ref ids) = patch.collection_ids {
            ensure_collections_exist(&mut tx, ids).await?;
            replace_links(&mut tx, id, ids).await?;
        }
        let row = Self::read_with(&mut tx, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Delete unless an order item still references the product.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            table("products")
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("product {}", id)));
        }
        let order_items: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE product_id = $1",
            table("order_items")
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if order_items > 0 {
            return Err(AppError::MethodNotAllowed(
                "Product cannot be deleted because it is associated with an order item.".into(),
            ));
        }
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("products")))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(product_id = id, "product deleted");
        Ok(())
    }
}

async fn ensure_collections_exist(conn: &mut PgConnection, ids: &[i64]) -> Result<(), AppError> {
    let found: Vec<i64> = sqlx::query_scalar(&format!(
        "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id",
        table("collections")
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(AppError::Validation(format!("no collection with id {}", missing)));
    }
    Ok(())
}

async fn replace_links(conn: &mut PgConnection, product_id: i64, collection_ids: &[i64]) -> Result<(), AppError> {
    let links = table("product_collections");
    sqlx::query(&format!("DELETE FROM {} WHERE product_id = $1", links))
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!(
        "INSERT INTO {} (product_id, collection_id) SELECT $1, UNNEST($2::bigint[])",
        links
    ))
    .bind(product_id)
    .bind(collection_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn slug_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("a product with this slug already exists".into())
        }
        _ => AppError::Db(e),
    }
}
