use actix_web::{error::ErrorInternalServerError, web, HttpResponse};
use anyhow::Context;

use crate::{
    auth::extractors::AdminUser,
    db_interaction::soft_delete_product,
    utils::{get_pooled_connection, DbPool},
};

#[tracing::instrument(
    "Flagging product as deleted",
    skip(pool)
)]
pub async fn delete_product(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    _: AdminUser,
) -> Result<HttpResponse, actix_web::Error> {
    let product_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let flagged = soft_delete_product(conn, product_id)
        .await
        .map_err(ErrorInternalServerError)?;

    if flagged {
        Ok(HttpResponse::Ok()
            .json(serde_json::json!({ "message": "Product flagged as deleted successfully" })))
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({ "error": "Product not found" })))
    }
}
