use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::{
    db_interaction::{get_product, get_products},
    models::Product,
    utils::{e500_json, get_pooled_connection, DbPool},
};

// Catalog listing entry; the deleted flag is not exposed here
#[derive(Serialize)]
pub struct ProductSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

// Detail view exposes the deleted flag so admins can see removed rows
#[derive(Serialize)]
pub struct ProductDetail {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub deleted: bool,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url: product.image_url,
        }
    }
}

impl From<Product> for ProductDetail {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url: product.image_url,
            deleted: product.deleted,
        }
    }
}

#[tracing::instrument(
    "Listing products",
    skip(pool)
)]
pub async fn list_products(pool: web::Data<DbPool>) -> Result<HttpResponse, actix_web::Error> {
    let conn = get_pooled_connection(&pool)
        .await
        .map_err(e500_json)?;

    let products = get_products(conn).await.map_err(e500_json)?;

    let summaries: Vec<ProductSummary> = products.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

#[tracing::instrument(
    "Getting product detail",
    skip(pool)
)]
pub async fn get_product_detail(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> Result<HttpResponse, actix_web::Error> {
    let product_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .map_err(e500_json)?;

    match get_product(conn, product_id)
        .await
        .map_err(e500_json)?
    {
        Some(product) => Ok(HttpResponse::Ok().json(ProductDetail::from(product))),
        None => Ok(HttpResponse::NotFound()
            .json(serde_json::json!({ "error": "Product not found" }))),
    }
}
