//! Apply the store schema: tables, constraints and indexes in dependency order.
//! Every statement is idempotent (IF NOT EXISTS), so this runs on every startup.

use crate::error::AppError;
use crate::store::{ensure_schema, table};
use sqlx::PgPool;

/// DDL in dependency order: referenced tables come before the tables that reference them.
pub fn schema_statements() -> Vec<String> {
    let users = table("users");
    let collections = table("collections");
    let products = table("products");
    let product_collections = table("product_collections");
    let reviews = table("reviews");
    let carts = table("carts");
    let cart_items = table("cart_items");
    let orders = table("orders");
    let order_items = table("order_items");

    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS {users} (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL DEFAULT 'customer' CHECK (role IN ('customer', 'admin')),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {collections} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {products} (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT,
                unit_price NUMERIC(6, 2) NOT NULL CHECK (unit_price >= 1),
                inventory INTEGER NOT NULL CHECK (inventory >= 0),
                last_update TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {product_collections} (
                product_id BIGINT NOT NULL REFERENCES {products} (id) ON DELETE CASCADE,
                collection_id BIGINT NOT NULL REFERENCES {collections} (id) ON DELETE RESTRICT,
                PRIMARY KEY (product_id, collection_id)
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {reviews} (
                id BIGSERIAL PRIMARY KEY,
                product_id BIGINT NOT NULL REFERENCES {products} (id) ON DELETE CASCADE,
                user_id BIGINT REFERENCES {users} (id) ON DELETE SET NULL,
                name VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                rating SMALLINT NOT NULL CHECK (rating BETWEEN 1 AND 5),
                date TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {carts} (
                id UUID PRIMARY KEY,
                user_id BIGINT REFERENCES {users} (id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {cart_items} (
                id BIGSERIAL PRIMARY KEY,
                cart_id UUID NOT NULL REFERENCES {carts} (id) ON DELETE CASCADE,
                product_id BIGINT NOT NULL REFERENCES {products} (id) ON DELETE CASCADE,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                UNIQUE (cart_id, product_id)
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {orders} (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES {users} (id) ON DELETE RESTRICT,
                payment_status TEXT NOT NULL DEFAULT 'pending' CHECK (payment_status IN ('pending', 'complete', 'failed')),
                placed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {order_items} (
                id BIGSERIAL PRIMARY KEY,
                order_id BIGINT NOT NULL REFERENCES {orders} (id) ON DELETE CASCADE,
                product_id BIGINT NOT NULL REFERENCES {products} (id) ON DELETE RESTRICT,
                quantity INTEGER NOT NULL CHECK (quantity >= 1),
                unit_price NUMERIC(6, 2) NOT NULL
            )"#
        ),
        format!("CREATE INDEX IF NOT EXISTS product_collections_collection_idx ON {product_collections} (collection_id)"),
        format!("CREATE INDEX IF NOT EXISTS reviews_product_idx ON {reviews} (product_id)"),
        format!("CREATE INDEX IF NOT EXISTS carts_user_idx ON {carts} (user_id)"),
        format!("CREATE INDEX IF NOT EXISTS orders_user_idx ON {orders} (user_id)"),
        format!("CREATE INDEX IF NOT EXISTS order_items_product_idx ON {order_items} (product_id)"),
    ]
}

/// Create the schema and apply every statement inside one transaction.
pub async fn apply_migrations(pool: &PgPool) -> Result<(), AppError> {
    ensure_schema(pool).await?;
    let statements = schema_statements();
    let mut tx = pool.begin().await?;
    for sql in &statements {
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(statements = statements.len(), "store schema applied");
    Ok(())
}
