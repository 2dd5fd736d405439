use bigdecimal::BigDecimal;
use diesel::{QueryDsl, RunQueryDsl};
use std::str::FromStr;
use storefront::schema::order_item;

use crate::helpers::TestApp;

async fn place_order(
    app: &TestApp,
    token: &str,
    items: serde_json::Value,
) -> reqwest::Response {
    app.api_client
        .post(format!("{}/orders/", app.get_app_url()))
        .bearer_auth(token)
        .json(&serde_json::json!({ "items": items }))
        .send()
        .await
        .unwrap()
}

#[actix_web::test]
pub async fn placing_an_order_decrements_stock_and_computes_the_exact_total() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 5, false, None);

    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": product_id, "quantity": 2 }]),
    )
    .await;

    assert_eq!(response.status().as_u16(), 201);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["order"]["total"], "20.00");
    assert_eq!(body["order"]["user_sub"], "user-sub-1");
    assert_eq!(body["order"]["items"][0]["product_name"], "Widget");
    assert_eq!(body["order"]["items"][0]["subtotal"], "20.00");

    assert_eq!(app.product_stock(product_id), 3);
}

#[actix_web::test]
pub async fn insufficient_stock_fails_and_leaves_stock_untouched() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 5, false, None);

    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": product_id, "quantity": 10 }]),
    )
    .await;

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Insufficient stock"));

    assert_eq!(app.product_stock(product_id), 5);
    assert_eq!(app.order_count(), 0);
}

#[actix_web::test]
pub async fn one_bad_line_rolls_back_the_whole_cart() {
    let app = TestApp::spawn_app().await;
    let good_id = app.seed_product("Widget", "10.00", 5, false, None);
    let deleted_id = app.seed_product("Gone", "10.00", 5, true, None);

    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(
        &app,
        &token,
        serde_json::json!([
            { "product_id": good_id, "quantity": 2 },
            { "product_id": deleted_id, "quantity": 1 }
        ]),
    )
    .await;

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no longer available"));

    // The valid first line must not leave a decrement behind
    assert_eq!(app.product_stock(good_id), 5);
    assert_eq!(app.order_count(), 0);
}

#[actix_web::test]
pub async fn concurrent_orders_for_the_last_unit_cannot_both_succeed() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 1, false, None);

    let alice = app.token_for("alice-sub", "alice", &[]);
    let bob = app.token_for("bob-sub", "bob", &[]);

    let items = serde_json::json!([{ "product_id": product_id, "quantity": 1 }]);
    let (first, second) = tokio::join!(
        place_order(&app, &alice, items.clone()),
        place_order(&app, &bob, items.clone())
    );

    let statuses = [first.status().as_u16(), second.status().as_u16()];
    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 1);

    assert_eq!(app.product_stock(product_id), 0);
    assert_eq!(app.order_count(), 1);
}

#[actix_web::test]
pub async fn non_list_items_payload_is_rejected_with_a_structured_error() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("alice-sub", "alice", &[]);

    for items in [
        serde_json::json!("not-a-list"),
        serde_json::json!(null),
        serde_json::json!({ "product_id": 1 }),
    ] {
        let response = place_order(&app, &token, items).await;

        assert_eq!(response.status().as_u16(), 400);

        let body = response.json::<serde_json::Value>().await.unwrap();
        assert_eq!(body["error"], "Order must include a list of items");
    }

    assert_eq!(app.order_count(), 0);
}

#[actix_web::test]
pub async fn syntactically_invalid_json_body_gets_a_structured_error() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("alice-sub", "alice", &[]);

    let response = app
        .api_client
        .post(format!("{}/orders/", app.get_app_url()))
        .bearer_auth(&token)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body["error"].is_string());
}

#[actix_web::test]
pub async fn empty_cart_is_rejected() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(&app, &token, serde_json::json!([])).await;

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "Order must include a list of items");
}

#[actix_web::test]
pub async fn zero_quantity_line_is_rejected_naming_the_entry() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 5, false, None);

    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": product_id, "quantity": 0 }]),
    )
    .await;

    assert_eq!(response.status().as_u16(), 400);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid item details"));
}

#[actix_web::test]
pub async fn unknown_product_in_cart_is_404() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("user-sub-1", "alice", &[]);

    let response = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": 999, "quantity": 1 }]),
    )
    .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
pub async fn order_without_token_is_401() {
    let app = TestApp::spawn_app().await;

    let response = app
        .api_client
        .post(format!("{}/orders/", app.get_app_url()))
        .json(&serde_json::json!({ "items": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[actix_web::test]
pub async fn listing_returns_only_the_callers_orders() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 50, false, None);

    let alice = app.token_for("alice-sub", "alice", &[]);
    let bob = app.token_for("bob-sub", "bob", &[]);

    place_order(&app, &alice, serde_json::json!([{ "product_id": product_id, "quantity": 1 }])).await;
    place_order(&app, &alice, serde_json::json!([{ "product_id": product_id, "quantity": 2 }])).await;
    place_order(&app, &bob, serde_json::json!([{ "product_id": product_id, "quantity": 3 }])).await;

    let response = app
        .api_client
        .get(format!("{}/orders/", app.get_app_url()))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["user_sub"], "alice-sub");
    assert_eq!(body["orders"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
pub async fn listing_with_no_orders_is_404() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("alice-sub", "alice", &[]);

    let response = app
        .api_client
        .get(format!("{}/orders/", app.get_app_url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "No orders found for this user");
}

#[actix_web::test]
pub async fn order_detail_is_idempotent_across_reads() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "19.99", 5, false, None);

    let token = app.token_for("alice-sub", "alice", &[]);

    let created = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": product_id, "quantity": 2 }]),
    )
    .await
    .json::<serde_json::Value>()
    .await
    .unwrap();
    let order_id = created["order"]["id"].as_i64().unwrap();

    let url = format!("{}/orders/{}", app.get_app_url(), order_id);
    let first = app
        .api_client
        .get(&url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let second = app
        .api_client
        .get(&url)
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first["total"], "39.98");
}

#[actix_web::test]
pub async fn order_detail_has_no_ownership_filter() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 5, false, None);

    let alice = app.token_for("alice-sub", "alice", &[]);
    let bob = app.token_for("bob-sub", "bob", &[]);

    let created = place_order(
        &app,
        &alice,
        serde_json::json!([{ "product_id": product_id, "quantity": 1 }]),
    )
    .await
    .json::<serde_json::Value>()
    .await
    .unwrap();
    let order_id = created["order"]["id"].as_i64().unwrap();

    let response = app
        .api_client
        .get(format!("{}/orders/{}", app.get_app_url(), order_id))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["user_sub"], "alice-sub");
}

#[actix_web::test]
pub async fn unknown_order_is_404() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("alice-sub", "alice", &[]);

    let response = app
        .api_client
        .get(format!("{}/orders/999", app.get_app_url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "Order not found");
}

#[actix_web::test]
pub async fn listing_failures_surface_as_structured_500s() {
    let app = TestApp::spawn_app().await;
    let token = app.token_for("alice-sub", "alice", &[]);

    // Break the schema underneath the handler so the query fails
    {
        let mut conn = app.pool.get().unwrap();
        diesel::sql_query("ALTER TABLE customer_order RENAME TO customer_order_hidden")
            .execute(&mut conn)
            .unwrap();
    }

    let response = app
        .api_client
        .get(format!("{}/orders/", app.get_app_url()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["error"], "An unexpected error occurred");
}

#[actix_web::test]
pub async fn line_price_is_captured_at_purchase_time() {
    let app = TestApp::spawn_app().await;
    let product_id = app.seed_product("Widget", "10.00", 5, false, None);

    let token = app.token_for("alice-sub", "alice", &[]);

    let created = place_order(
        &app,
        &token,
        serde_json::json!([{ "product_id": product_id, "quantity": 1 }]),
    )
    .await
    .json::<serde_json::Value>()
    .await
    .unwrap();
    let order_id = created["order"]["id"].as_i64().unwrap();

    // The catalog price changes after the purchase
    {
        use diesel::ExpressionMethods;
        use storefront::schema::product;

        let mut conn = app.pool.get().unwrap();
        diesel::update(product::table.find(product_id))
            .set(product::price.eq(BigDecimal::from_str("99.99").unwrap()))
            .execute(&mut conn)
            .unwrap();
    }

    let response = app
        .api_client
        .get(format!("{}/orders/{}", app.get_app_url(), order_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert_eq!(response["items"][0]["price"], "10.00");
    assert_eq!(response["total"], "10.00");

    let mut conn = app.pool.get().unwrap();
    let line_count: i64 = order_item::table.count().get_result(&mut conn).unwrap();
    assert_eq!(line_count, 1);
}
