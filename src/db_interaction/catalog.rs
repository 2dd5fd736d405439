use std::{error::Error, fmt::Debug};

use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::AsChangeset;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use thiserror::Error;

use crate::{
    models::{NewProduct, Product},
    schema::product,
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection},
};

// Partial update; absent fields are left untouched
#[derive(AsChangeset)]
#[diesel(table_name = product)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProductChanges {
    pub fn new() -> Self {
        Self {
            name: None,
            description: None,
            price: None,
            stock: None,
            image_url: None,
            updated_at: Utc::now(),
        }
    }
}

impl Default for ProductChanges {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error)]
pub enum ProductInsertError {
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to insert into product table")]
    InsertError(#[from] diesel::result::Error),
}

impl Debug for ProductInsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

// Catalog listing excludes soft-deleted rows
#[tracing::instrument(
    "Getting products from db",
    skip_all
)]
pub async fn get_products(mut conn: DbConnection) -> Result<Vec<Product>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        product::table
            .filter(product::deleted.eq(false))
            .order(product::id.asc())
            .load::<Product>(&mut conn)
            .context("Failed to get products")
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(res)
}

// Lookup by id ignores the deleted flag, so historical order references
// keep resolving after a product is removed from the catalog
#[tracing::instrument(
    "Getting product by id",
    skip(conn)
)]
pub async fn get_product(
    mut conn: DbConnection,
    product_id: i32,
) -> Result<Option<Product>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        product::table
            .find(product_id)
            .first::<Product>(&mut conn)
            .optional()
            .context("Failed to get product")
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(res)
}

#[tracing::instrument(
    "Inserting product into db",
    skip_all
)]
pub async fn insert_product(
    mut conn: DbConnection,
    new_product: NewProduct,
) -> Result<Product, ProductInsertError> {
    let res = spawn_blocking_with_tracing(move || {
        diesel::insert_into(product::table)
            .values(new_product)
            .get_result::<Product>(&mut conn)
    })
    .await??;

    Ok(res)
}

// Returns None when no row matches the id
#[tracing::instrument(
    "Updating product in db",
    skip(conn, changes)
)]
pub async fn update_product(
    mut conn: DbConnection,
    product_id: i32,
    changes: ProductChanges,
) -> Result<Option<Product>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        diesel::update(product::table.find(product_id))
            .set(changes)
            .get_result::<Product>(&mut conn)
            .optional()
            .context("Failed to update product")
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(res)
}

// Soft delete: the row and its image asset stay, only the flag flips
#[tracing::instrument(
    "Flagging product as deleted",
    skip(conn)
)]
pub async fn soft_delete_product(
    mut conn: DbConnection,
    product_id: i32,
) -> Result<bool, anyhow::Error> {
    let affected_rows = spawn_blocking_with_tracing(move || {
        diesel::update(product::table.find(product_id))
            .set((product::deleted.eq(true), product::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .context("Failed to flag product as deleted")
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(affected_rows > 0)
}
