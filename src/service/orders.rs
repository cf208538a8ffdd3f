//! Orders placed from carts.

use crate::auth::Caller;
use crate::error::AppError;
use crate::service::carts;
use crate::service::pricing::{line_total, sum_totals};
use crate::store::table;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Complete,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Complete => "complete",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "complete" => Ok(PaymentStatus::Complete),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::Validation(format!("unknown payment_status: {}", other))),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub user_id: i64,
    pub payment_status: String,
    pub placed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: i64,
    pub title: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub payment_status: PaymentStatus,
    pub placed_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
    pub total_price: Decimal,
}

impl Order {
    pub fn assemble(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Self, AppError> {
        let items: Vec<OrderItem> = items
            .into_iter()
            .map(|i| OrderItem {
                total_price: line_total(i.unit_price, i.quantity),
                id: i.id,
                product_id: i.product_id,
                title: i.title,
                quantity: i.quantity,
                unit_price: i.unit_price,
            })
            .collect();
        Ok(Order {
            total_price: sum_totals(items.iter().map(|i| i.total_price)),
            payment_status: row.payment_status.parse()?,
            id: row.id,
            user_id: row.user_id,
            placed_at: row.placed_at,
            items,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateOrderInput {
    pub cart_id: Uuid,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateOrderInput {
    pub payment_status: PaymentStatus,
}

pub fn can_view(order: &OrderRow, caller: &Caller) -> bool {
    caller.is_admin() || order.user_id == caller.user_id
}

/// A cart line joined with the locked product row.
#[derive(Debug, sqlx::FromRow)]
struct Line {
    product_id: i64,
    title: String,
    quantity: i32,
    unit_price: Decimal,
    inventory: i32,
}

fn check_stock(lines: &[Line]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(AppError::Validation("The cart is empty.".into()));
    }
    if let Some(short) = lines.iter().find(|l| l.quantity > l.inventory) {
        return Err(AppError::Validation(format!(
            "insufficient inventory for product {} ({}): {} requested, {} available",
            short.product_id, short.title, short.quantity, short.inventory
        )));
    }
    Ok(())
}

const ORDER_COLUMNS: &str = "id, user_id, payment_status, placed_at";

fn item_select() -> String {
    format!(
        "SELECT oi.id, oi.order_id, oi.product_id, p.title, oi.quantity, oi.unit_price \
         FROM {} oi JOIN {} p ON p.id = oi.product_id",
        table("order_items"),
        table("products")
    )
}

pub struct OrderService;

impl OrderService {
    /// Turn a cart into an order for `caller`: prices are copied into the order
    /// items, inventory is decremented and the cart is removed. All or nothing.
    pub async fn create_from_cart(pool: &PgPool, caller: &Caller, cart_id: Uuid) -> Result<Order, AppError> {
        let mut tx = pool.begin().await?;
        let cart = sqlx::query_as::<_, carts::CartRow>(&format!(
            "SELECT id, user_id, created_at FROM {} WHERE id = $1 FOR UPDATE",
            table("carts")
        ))
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::Validation(format!("No cart with the given ID was found: {}", cart_id)))?;
        carts::authorize(&cart, Some(caller))?;

        let lines = sqlx::query_as::<_, Line>(&format!(
            "SELECT p.id AS product_id, p.title, ci.quantity, p.unit_price, p.inventory \
             FROM {} ci JOIN {} p ON p.id = ci.product_id WHERE ci.cart_id = $1 \
             ORDER BY p.id FOR UPDATE OF p",
            table("cart_items"),
            table("products")
        ))
        .bind(cart_id)
        .fetch_all(&mut *tx)
        .await?;
        check_stock(&lines)?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO {} (user_id) VALUES ($1) RETURNING {}",
            table("orders"),
            ORDER_COLUMNS
        ))
        .bind(caller.user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(&format!(
                "INSERT INTO {} (order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4)",
                table("order_items")
            ))
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
            sqlx::query(&format!(
                "UPDATE {} SET inventory = inventory - $2, last_update = NOW() WHERE id = $1",
                table("products")
            ))
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("carts")))
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        let items = Self::items_with(&mut tx, &[order.id]).await?;
        tx.commit().await?;
        tracing::info!(order_id = order.id, user_id = caller.user_id, items = lines.len(), "order placed");
        Order::assemble(order, items)
    }

    async fn items_with(conn: &mut PgConnection, order_ids: &[i64]) -> Result<Vec<OrderItemRow>, AppError> {
        let sql = format!("{} WHERE oi.order_id = ANY($1) ORDER BY oi.order_id, oi.id", item_select());
        Ok(sqlx::query_as::<_, OrderItemRow>(&sql)
            .bind(order_ids)
            .fetch_all(&mut *conn)
            .await?)
    }

    /// Orders visible to the caller, newest first.
    pub async fn list(pool: &PgPool, caller: &Caller) -> Result<Vec<Order>, AppError> {
        let table_name = table("orders");
        let rows = if caller.is_admin() {
            sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {} FROM {} ORDER BY placed_at DESC, id DESC",
                ORDER_COLUMNS, table_name
            ))
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as::<_, OrderRow>(&format!(
                "SELECT {} FROM {} WHERE user_id = $1 ORDER BY placed_at DESC, id DESC",
                ORDER_COLUMNS, table_name
            ))
            .bind(caller.user_id)
            .fetch_all(pool)
            .await?
        };
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut conn = pool.acquire().await?;
        let mut by_order: HashMap<i64, Vec<OrderItemRow>> = HashMap::new();
        for item in Self::items_with(&mut conn, &ids).await? {
            by_order.entry(item.order_id).or_default().push(item);
        }
        rows.into_iter()
            .map(|r| {
                let items = by_order.remove(&r.id).unwrap_or_default();
                Order::assemble(r, items)
            })
            .collect()
    }

    pub async fn get_row(pool: &PgPool, id: i64) -> Result<Option<OrderRow>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", ORDER_COLUMNS, table("orders"));
        Ok(sqlx::query_as::<_, OrderRow>(&sql).bind(id).fetch_optional(pool).await?)
    }

    /// Fetch one order. Orders the caller may not see are reported as missing.
    pub async fn get(pool: &PgPool, caller: &Caller, id: i64) -> Result<Order, AppError> {
        let row = Self::get_row(pool, id)
            .await?
            .filter(|r| can_view(r, caller))
            .ok_or_else(|| AppError::NotFound(format!("order {}", id)))?;
        let mut conn = pool.acquire().await?;
        let items = Self::items_with(&mut conn, &[row.id]).await?;
        Order::assemble(row, items)
    }

    pub async fn update_status(pool: &PgPool, id: i64, status: PaymentStatus) -> Result<Option<Order>, AppError> {
        let sql = format!(
            "UPDATE {} SET payment_status = $2 WHERE id = $1 RETURNING {}",
            table("orders"),
            ORDER_COLUMNS
        );
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };
        tracing::info!(order_id = id, payment_status = %status, "order status changed");
        let mut conn = pool.acquire().await?;
        let items = Self::items_with(&mut conn, &[row.id]).await?;
        Order::assemble(row, items).map(Some)
    }

    /// Returns false when no such order exists.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table("orders")))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(product_id: i64, quantity: i32, inventory: i32) -> Line {
        Line {
            product_id,
            title: format!("Product {product_id}"),
            quantity,
            unit_price: d("2.50"),
            inventory,
        }
    }

    fn row(user_id: i64) -> OrderRow {
        OrderRow {
            id: 1,
            user_id,
            payment_status: "pending".into(),
            placed_at: Utc::now(),
        }
    }

    #[test]
    fn stock_must_cover_every_line() {
        check_stock(&[line(1, 2, 2), line(2, 1, 5)]).unwrap();
        let err = check_stock(&[line(1, 2, 2), line(2, 6, 5)]).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("product 2")));
    }

    #[test]
    fn empty_cart_cannot_be_ordered() {
        assert!(matches!(check_stock(&[]), Err(AppError::Validation(_))));
    }

    #[test]
    fn payment_status_parses_known_values() {
        assert_eq!("complete".parse::<PaymentStatus>().unwrap(), PaymentStatus::Complete);
        assert!("shipped".parse::<PaymentStatus>().is_err());
        assert_eq!(serde_json::to_value(PaymentStatus::Failed).unwrap(), "failed");
    }

    #[test]
    fn order_totals_use_snapshot_prices() {
        let items = vec![OrderItemRow {
            id: 1,
            order_id: 1,
            product_id: 4,
            title: "Tin".into(),
            quantity: 3,
            unit_price: d("2.50"),
        }];
        let order = Order::assemble(row(7), items).unwrap();
        assert_eq!(order.total_price, d("7.50"));
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn only_owner_or_admin_sees_order() {
        let owner = Caller { user_id: 7, role: Role::Customer };
        let other = Caller { user_id: 8, role: Role::Customer };
        let admin = Caller { user_id: 1, role: Role::Admin };
        assert!(can_view(&row(7), &owner));
        assert!(!can_view(&row(7), &other));
        assert!(can_view(&row(7), &admin));
    }
}
