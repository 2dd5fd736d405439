use actix_web::{web, HttpResponse};
use anyhow::Context;

use crate::{
    auth::extractors::AuthenticatedUser,
    db_interaction::{get_order_by_id, get_orders_for_user},
    utils::{e500_json, get_pooled_connection, DbPool},
};

#[tracing::instrument(
    "Getting caller's orders",
    skip(pool, user)
)]
pub async fn get_orders(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, actix_web::Error> {
    let user_sub = user.0.sub;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(e500_json)?;

    let orders = get_orders_for_user(conn, user_sub.clone())
        .await
        .map_err(e500_json)?;

    if orders.is_empty() {
        return Ok(HttpResponse::NotFound()
            .json(serde_json::json!({ "error": "No orders found for this user" })));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_sub": user_sub,
        "orders": orders
    })))
}

// Any authenticated caller can fetch any order by id; there is no
// ownership filter on this lookup
#[tracing::instrument(
    "Getting order detail",
    skip(pool, _user)
)]
pub async fn get_order_detail(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, actix_web::Error> {
    let order_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(e500_json)?;

    match get_order_by_id(conn, order_id)
        .await
        .map_err(e500_json)?
    {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => {
            Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "Order not found" })))
        }
    }
}
