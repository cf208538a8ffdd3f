//! Store API routes, mounted under `/api/v1`.

use crate::handlers::{auth, carts, collections, orders, products, reviews};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn store_routes(state: AppState) -> Router {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            get(products::read).patch(products::update).delete(products::delete),
        )
        .route("/products/:id/reviews", get(reviews::list).post(reviews::create))
        .route(
            "/products/:id/reviews/:review_id",
            get(reviews::read).patch(reviews::update).delete(reviews::delete),
        )
        .route("/collections", get(collections::list).post(collections::create))
        .route(
            "/collections/:id",
            get(collections::read)
                .patch(collections::update)
                .delete(collections::delete),
        )
        .route("/carts", post(carts::create))
        .route("/carts/:id", get(carts::read).delete(carts::delete))
        .route("/carts/:id/items", get(carts::list_items).post(carts::add_item))
        .route(
            "/carts/:id/items/:item_id",
            get(carts::read_item)
                .patch(carts::update_item)
                .delete(carts::delete_item),
        )
        .route("/orders", get(orders::list).post(orders::create))
        .route(
            "/orders/:id",
            get(orders::read).patch(orders::update).delete(orders::delete),
        )
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/users/:id/role", patch(auth::set_role))
        .with_state(state)
}
