//! End-to-end flows against a real PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{router, send, settings, token};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use store_api::auth::Role;
use store_api::{apply_migrations, ensure_database_exists, AppState};

async fn live_state() -> AppState {
    let settings = settings();
    ensure_database_exists(&settings.database_url).await.unwrap();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&settings.database_url)
        .await
        .unwrap();
    apply_migrations(&pool).await.unwrap();
    AppState::new(pool, settings)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Register a user, set its role directly and return `(id, token)`.
async fn user(app: &Router, state: &AppState, role: Role) -> (i64, String) {
    let email = format!("{}@example.com", unique("user"));
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({"email": email, "password": "correct horse battery", "first_name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();
    if role == Role::Admin {
        store_api::service::UserService::set_role(&state.pool, id, Role::Admin)
            .await
            .unwrap();
    }
    (id, token(state, id, role))
}

async fn collection(app: &Router, admin: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/collections",
        Some(admin),
        Some(json!({"title": unique("Teas")})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

async fn product(app: &Router, admin: &str, collection_id: i64, price: &str, inventory: i32) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/products",
        Some(admin),
        Some(json!({
            "title": unique("Earl Grey"),
            "unit_price": price,
            "inventory": inventory,
            "collection_ids": [collection_id],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
#[ignore]
async fn product_crud_with_tax_and_guarded_collection_delete() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let (_, customer) = user(&app, &state, Role::Customer).await;
    let cid = collection(&app, &admin).await;

    let p = product(&app, &admin, cid, "10.00", 5).await;
    assert_eq!(p["price_with_tax"], "11.00");
    assert_eq!(p["collection_ids"], json!([cid]));
    assert_eq!(p["reviews_count"], 0);
    let pid = p["id"].as_i64().unwrap();

    let uri = format!("/api/v1/collections/{cid}");
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/products/{pid}"),
        Some(&admin),
        Some(json!({"inventory": -3})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/products/{pid}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn adding_same_product_twice_increments_quantity() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let cid = collection(&app, &admin).await;
    let pid = product(&app, &admin, cid, "4.50", 10).await["id"].as_i64().unwrap();

    let (status, cart) = send(&app, Method::POST, "/api/v1/carts", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["data"]["total_price"], "0.00");
    let cart_id = cart["data"]["id"].as_str().unwrap().to_string();
    let items_uri = format!("/api/v1/carts/{cart_id}/items");

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            Method::POST,
            &items_uri,
            None,
            Some(json!({"product_id": pid, "quantity": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = send(&app, Method::GET, &format!("/api/v1/carts/{cart_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 4);
    assert_eq!(body["data"]["total_price"], "18.00");

    let (status, body) = send(
        &app,
        Method::POST,
        &items_uri,
        None,
        Some(json!({"product_id": i64::MAX, "quantity": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("No product with the given ID was found."));
}

#[tokio::test]
#[ignore]
async fn owned_cart_is_private_and_orders_decrement_stock() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let (_, owner) = user(&app, &state, Role::Customer).await;
    let (_, stranger) = user(&app, &state, Role::Customer).await;
    let cid = collection(&app, &admin).await;
    let pid = product(&app, &admin, cid, "2.00", 3).await["id"].as_i64().unwrap();

    let (_, cart) = send(&app, Method::POST, "/api/v1/carts", Some(&owner), None).await;
    let cart_id = cart["data"]["id"].as_str().unwrap().to_string();
    let cart_uri = format!("/api/v1/carts/{cart_id}");
    let (status, _) = send(&app, Method::GET, &cart_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, &cart_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(
        &app,
        Method::POST,
        &format!("{cart_uri}/items"),
        Some(&owner),
        Some(json!({"product_id": pid, "quantity": 4})),
    )
    .await;
    let (status, _) = send(&app, Method::POST, "/api/v1/orders", Some(&owner), Some(json!({"cart_id": cart_id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, items) = send(&app, Method::GET, &format!("{cart_uri}/items"), Some(&owner), None).await;
    let item_id = items["data"][0]["id"].as_i64().unwrap();
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("{cart_uri}/items/{item_id}"),
        Some(&owner),
        Some(json!({"quantity": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, order) = send(&app, Method::POST, "/api/v1/orders", Some(&owner), Some(json!({"cart_id": cart_id}))).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["data"]["total_price"], "6.00");
    assert_eq!(order["data"]["payment_status"], "pending");

    let (_, p) = send(&app, Method::GET, &format!("/api/v1/products/{pid}"), None, None).await;
    assert_eq!(p["data"]["inventory"], 0);
    let (status, _) = send(&app, Method::GET, &cart_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/products/{pid}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let order_uri = format!("/api/v1/orders/{}", order["data"]["id"]);
    let (status, _) = send(&app, Method::GET, &order_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(
        &app,
        Method::PATCH,
        &order_uri,
        Some(&admin),
        Some(json!({"payment_status": "complete"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "complete");
}

#[tokio::test]
#[ignore]
async fn reviews_are_aggregated_and_owned() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let (_, author) = user(&app, &state, Role::Customer).await;
    let (_, other) = user(&app, &state, Role::Customer).await;
    let cid = collection(&app, &admin).await;
    let pid = product(&app, &admin, cid, "8.00", 1).await["id"].as_i64().unwrap();
    let reviews_uri = format!("/api/v1/products/{pid}/reviews");

    let (status, _) = send(&app, Method::POST, &reviews_uri, None, Some(json!({"rating": 5, "description": "x"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&author),
        Some(json!({"rating": 6, "description": "too good"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, review) = send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&author),
        Some(json!({"rating": 4, "description": "Bright and floral"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{review}");
    assert_eq!(review["data"]["name"], "Ada");
    send(
        &app,
        Method::POST,
        &reviews_uri,
        Some(&other),
        Some(json!({"rating": 5, "name": "Grace", "description": "Lovely"})),
    )
    .await;

    let (_, p) = send(&app, Method::GET, &format!("/api/v1/products/{pid}"), None, None).await;
    assert_eq!(p["data"]["reviews_count"], 2);
    assert_eq!(p["data"]["average_rating"], "4.50");

    let review_uri = format!("{reviews_uri}/{}", review["data"]["id"]);
    let (status, _) = send(&app, Method::DELETE, &review_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &review_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore]
async fn login_returns_bearer_token() {
    let state = live_state().await;
    let app = router(state.clone());
    let email = format!("{}@example.com", unique("login"));
    let creds = json!({"email": email, "password": "correct horse battery"});
    let (status, _) = send(&app, Method::POST, "/api/v1/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, Method::POST, "/api/v1/auth/register", None, Some(creds.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::POST, "/api/v1/auth/login", None, Some(creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let t = body["data"]["token"].as_str().unwrap().to_string();
    let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(&t), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["role"], "customer");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": "wrong password!"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn list(app: &Router, query: &str) -> (StatusCode, Value) {
    send(app, Method::GET, &format!("/api/v1/products?{query}"), None, None).await
}

fn prices(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["unit_price"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
#[ignore]
async fn product_list_filters_orders_and_paginates() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let teas = collection(&app, &admin).await;
    let mugs = collection(&app, &admin).await;
    let marker = unique("blend").replace('-', "");

    let mut ids = Vec::new();
    for i in 1..=11 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/products",
            Some(&admin),
            Some(json!({
                "title": format!("{marker} tea {i}"),
                "description": if i == 3 { "smoky lapsang" } else { "plain" },
                "unit_price": format!("{i}.00"),
                "inventory": 5,
                "collection_ids": [teas],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        ids.push(body["data"]["id"].as_i64().unwrap());
    }
    let mug = product(&app, &admin, mugs, "20.00", 1).await;

    let (status, page1) = list(&app, &format!("collection_id={teas}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page1["meta"]["count"], 11);
    assert_eq!(page1["meta"]["page"], 1);
    assert_eq!(page1["meta"]["next"], 2);
    assert_eq!(page1["meta"]["previous"], Value::Null);
    assert_eq!(page1["data"].as_array().unwrap().len(), 10);
    assert_eq!(page1["data"][0]["id"], ids[0]);

    let (status, page2) = list(&app, &format!("collection_id={teas}&page=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page2["meta"]["next"], Value::Null);
    assert_eq!(page2["meta"]["previous"], 1);
    assert_eq!(page2["data"].as_array().unwrap().len(), 1);
    assert_eq!(page2["data"][0]["id"], ids[10]);

    let (status, body) = list(&app, &format!("collection_id={teas}&page=3")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (_, body) = list(&app, &format!("collection_id={teas}&unit_price__gt=5&unit_price__lt=9")).await;
    assert_eq!(prices(&body), vec!["6.00", "7.00", "8.00"]);

    let (_, body) = list(&app, &format!("collection_id={teas}&ordering=-unit_price")).await;
    assert_eq!(body["data"][0]["unit_price"], "11.00");
    let (_, body) = list(&app, &format!("collection_id={teas}&ordering=unit_price")).await;
    assert_eq!(body["data"][0]["unit_price"], "1.00");

    let (_, body) = list(&app, &format!("search={}", marker.to_uppercase())).await;
    assert_eq!(body["meta"]["count"], 11);
    let (_, body) = list(&app, &format!("search={marker}&collection_id={teas}&unit_price__lt=4")).await;
    assert_eq!(body["meta"]["count"], 3);
    let (_, body) = list(&app, &format!("search={marker}%25")).await;
    assert_eq!(body["meta"]["count"], 0);
    let (_, body) = list(&app, &format!("collection_id={mugs}")).await;
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["data"][0]["id"], mug["id"]);

    let (status, cols) = send(&app, Method::GET, "/api/v1/collections", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let teas_row = cols["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == teas)
        .cloned()
        .unwrap();
    assert_eq!(teas_row["products_count"], 11);

    let moved = ids[0];
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/v1/products/{moved}"),
        Some(&admin),
        Some(json!({"collection_ids": [mugs], "description": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["collection_ids"], json!([mugs]));
    assert_eq!(body["data"]["description"], Value::Null);

    let (_, c) = send(&app, Method::GET, &format!("/api/v1/collections/{teas}"), None, None).await;
    assert_eq!(c["data"]["products_count"], 10);
    let (_, c) = send(&app, Method::GET, &format!("/api/v1/collections/{mugs}"), None, None).await;
    assert_eq!(c["data"]["products_count"], 2);
    let (_, body) = list(&app, &format!("collection_id={teas}")).await;
    assert_eq!(body["meta"]["count"], 10);
    assert_eq!(body["meta"]["next"], Value::Null);
}

#[tokio::test]
#[ignore]
async fn cart_line_quantity_is_capped() {
    let state = live_state().await;
    let app = router(state.clone());
    let (_, admin) = user(&app, &state, Role::Admin).await;
    let cid = collection(&app, &admin).await;
    let pid = product(&app, &admin, cid, "1.00", 1).await["id"].as_i64().unwrap();
    let (_, cart) = send(&app, Method::POST, "/api/v1/carts", None, None).await;
    let items_uri = format!("/api/v1/carts/{}/items", cart["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::POST, &items_uri, None, Some(json!({"product_id": pid, "quantity": 32767}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, &items_uri, None, Some(json!({"product_id": pid, "quantity": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["code"], "validation_error");

    let (_, items) = send(&app, Method::GET, &items_uri, None, None).await;
    assert_eq!(items["data"][0]["quantity"], 32767);
}
