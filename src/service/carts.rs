//! Shopping carts and their line items.
//!
//! A cart is addressed by UUID. Carts created without a token are anonymous and
//! open to anyone holding the id; carts created by a signed-in user are owned and
//! only that user (or an admin) may use them.

use crate::auth::Caller;
use crate::error::{AppError, AuthError};
use crate::service::pricing::{line_total, sum_totals};
use crate::store::table;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: i64,
    pub cart_id: Uuid,
    pub product_id: i64,
    pub quantity: i32,
    pub title: String,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SimpleProduct {
    pub id: i64,
    pub title: String,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CartItem {
    pub id: i64,
    pub product: SimpleProduct,
    pub quantity: i32,
    pub total_price: Decimal,
}

impl From<CartItemRow> for CartItem {
    fn from(r: CartItemRow) -> Self {
        CartItem {
            id: r.id,
            total_price: line_total(r.unit_price, r.quantity),
            quantity: r.quantity,
            product: SimpleProduct {
                id: r.product_id,
                title: r.title,
                unit_price: r.unit_price,
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub total_price: Decimal,
}

impl Cart {
    pub fn assemble(row: CartRow, items: Vec<CartItemRow>) -> Self {
        let items: Vec<CartItem> = items.into_iter().map(CartItem::from).collect();
        let total_price = sum_totals(items.iter().map(|i| i.total_price));
        Cart {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            items,
            total_price,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddItemInput {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateItemInput {
    pub quantity: i32,
}

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = i16::MAX as i32;

pub fn check_quantity(q: i32) -> Result<(), AppError> {
    if q < 1 {
        return Err(AppError::Validation("quantity must be at least 1".into()));
    }
    if q > MAX_LINE_QUANTITY {
        return Err(AppError::Validation(format!("quantity must be at most {}", MAX_LINE_QUANTITY)));
    }
    Ok(())
}

/// Anonymous carts are open; owned carts need the owner or an admin.
pub fn authorize(cart: &CartRow, caller: Option<&Caller>) -> Result<(), AppError> {
    let Some(owner) = cart.user_id else {
        return Ok(());
    };
    match caller {
        None => Err(AppError::Auth(AuthError::MissingCredentials)),
        Some(c) if c.user_id == owner || c.is_admin() => Ok(()),
        Some(_) => Err(AppError::Forbidden("this cart belongs to another user".into())),
    }
}

/// Insert or increment a line. The increment is skipped (no row returned) when the
/// new total would exceed `$4`.
fn upsert_item_sql() -> String {
    format!(
        "INSERT INTO {items} AS ci (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = ci.quantity + EXCLUDED.quantity \
         WHERE ci.quantity::bigint + EXCLUDED.quantity <= $4 \
         RETURNING ci.id",
        items = table("cart_items")
    )
}

fn item_select() -> String {
    format!(
        "SELECT ci.id, ci.cart_id, ci.product_id, ci.quantity, p.title, p.unit_price \
         FROM {} ci JOIN {} p ON p.id = ci.product_id",
        table("cart_items"),
        table("products")
    )
}

pub struct CartService;

impl CartService {
    pub async fn create(pool: &PgPool, owner: Option<i64>) -> Result<CartRow, AppError> {
        let sql = format!(
            "INSERT INTO {} (id, user_id) VALUES ($1, $2) RETURNING id, user_id, created_at",
            table("carts")
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner)
            .fetch_one(pool)
            .await?;
        tracing::debug!(cart_id = %row.id, owned = owner.is_some(), "cart created");
        Ok(row)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<CartRow>, AppError> {
        let sql = format!("SELECT id, user_id, created_at FROM {} WHERE id = $1", table("carts"));
        Ok(sqlx::query_as::<_, CartRow>(&sql).bind(id).fetch_optional(pool).await?)
    }

    /// Fetch the cart and check the caller may use it; 404 when missing.
    pub async fn get_authorized(pool: &PgPool, id: Uuid, caller: Option<&Caller>) -> Result<CartRow, AppError> {
        let cart = Self::get(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart {}", id)))?;
        authorize(&cart, caller)?;
        Ok(cart)
    }

    pub async fn items(pool: &PgPool, cart_id: Uuid) -> Result<Vec<CartItemRow>, AppError> {
        let mut conn = pool.acquire().await?;
        Self::items_with(&mut conn, cart_id).await
    }

    pub(crate) async fn items_with(conn: &mut PgConnection, cart_id: Uuid) -> Result<Vec<CartItemRow>, AppError> {
        let sql = format!("{} WHERE ci.cart_id = $1 ORDER BY ci.id", item_select());
        Ok(sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *conn)
            .await?)
    }

    pub async fn item(pool: &PgPool, cart_id: Uuid, item_id: i64) -> Result<Option<CartItemRow>, AppError> {
        let sql = format!("{} WHERE ci.cart_id = $1 AND ci.id = $2", item_select());
        Ok(sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .bind(item_id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("carts")))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Add `quantity` of a product. A product already in the cart has its quantity
    /// incremented, so each product appears in at most one line.
    pub async fn add_item(pool: &PgPool, cart_id: Uuid, input: AddItemInput) -> Result<CartItemRow, AppError> {
        check_quantity(input.quantity)?;
        let product: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {} WHERE id = $1", table("products")))
            .bind(input.product_id)
            .fetch_optional(pool)
            .await?;
        if product.is_none() {
            return Err(AppError::Validation("No product with the given ID was found.".into()));
        }
        let item_id: Option<i64> = sqlx::query_scalar(&upsert_item_sql())
            .bind(cart_id)
            .bind(input.product_id)
            .bind(input.quantity)
            .bind(i64::from(MAX_LINE_QUANTITY))
            .fetch_optional(pool)
            .await?;
        let item_id = item_id.ok_or_else(|| {
            AppError::Validation(format!(
                "quantity in the cart may not exceed {} for one product",
                MAX_LINE_QUANTITY
            ))
        })?;
        Self::item(pool, cart_id, item_id)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    pub async fn update_item(
        pool: &PgPool,
        cart_id: Uuid,
        item_id: i64,
        input: UpdateItemInput,
    ) -> Result<Option<CartItemRow>, AppError> {
        check_quantity(input.quantity)?;
        let sql = format!(
            "UPDATE {} SET quantity = $3 WHERE cart_id = $1 AND id = $2 RETURNING id",
            table("cart_items")
        );
        let updated: Option<i64> = sqlx::query_scalar(&sql)
            .bind(cart_id)
            .bind(item_id)
            .bind(input.quantity)
            .fetch_optional(pool)
            .await?;
        match updated {
            Some(id) => Self::item(pool, cart_id, id).await,
            None => Ok(None),
        }
    }

    /// Remove a line; returns false when it does not exist in this cart.
    pub async fn delete_item(pool: &PgPool, cart_id: Uuid, item_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE cart_id = $1 AND id = $2",
            table("cart_items")
        ))
        .bind(cart_id)
        .bind(item_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
