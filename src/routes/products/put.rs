use std::{error::Error, fmt::Debug};

use actix_multipart::form::{bytes::Bytes as UploadedFile, text::Text, MultipartForm};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;

use super::get::ProductSummary;
use super::post::{parse_price, parse_stock};
use crate::{
    auth::extractors::AdminUser,
    blob_client::BlobClient,
    db_interaction::{get_product, update_product, ProductChanges},
    utils::{error_fmt_chain, get_pooled_connection, DbPool},
};

#[derive(MultipartForm)]
pub struct EditProductForm {
    pub name: Option<Text<String>>,
    pub description: Option<Text<String>>,
    pub price: Option<Text<String>>,
    pub stock: Option<Text<String>>,
    pub file: Option<UploadedFile>,
}

#[derive(Error)]
pub enum EditProductError {
    #[error("Product not found")]
    NotFound,
    #[error("{0}")]
    InvalidField(String),
    #[error("Failed to upload image to the blob store")]
    UploadError(#[from] reqwest::Error),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for EditProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for EditProductError {
    fn status_code(&self) -> StatusCode {
        match self {
            EditProductError::NotFound => StatusCode::NOT_FOUND,
            EditProductError::InvalidField(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

// Replace-then-orphan-delete: a new image is uploaded before the row is
// touched, and the old asset is deleted only once the new URL is
// committed. If the commit fails, the new upload is the orphan and gets
// cleaned up; the old asset stays linked.
#[tracing::instrument(
    "Editing product",
    skip(pool, blob_client, form)
)]
pub async fn put_product(
    pool: web::Data<DbPool>,
    blob_client: web::Data<BlobClient>,
    path: web::Path<i32>,
    MultipartForm(form): MultipartForm<EditProductForm>,
    _: AdminUser,
) -> Result<HttpResponse, EditProductError> {
    let product_id = path.into_inner();

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let existing = get_product(conn, product_id)
        .await?
        .ok_or(EditProductError::NotFound)?;

    let mut changes = ProductChanges::new();
    changes.name = form.name.map(|t| t.into_inner());
    changes.description = form.description.map(|t| t.into_inner());

    // Form values arrive as strings; they are always coerced to the
    // canonical column types so no mixed-type values get stored.
    if let Some(raw) = form.price {
        changes.price = Some(parse_price(&raw).map_err(EditProductError::InvalidField)?);
    }
    if let Some(raw) = form.stock {
        changes.stock = Some(parse_stock(&raw).map_err(EditProductError::InvalidField)?);
    }

    let mut new_image_url = None;
    if let Some(file) = form.file {
        let file_name = file.file_name.unwrap_or_else(|| "upload".to_string());
        let content_type = file
            .content_type
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let uploaded = blob_client
            .upload(&file_name, &content_type, file.data)
            .await?;
        changes.image_url = Some(uploaded.clone());
        new_image_url = Some(uploaded);
    }

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let updated = match update_product(conn, product_id, changes).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            cleanup_new_upload(&blob_client, &new_image_url).await;
            return Err(EditProductError::NotFound);
        }
        Err(e) => {
            cleanup_new_upload(&blob_client, &new_image_url).await;
            return Err(e.into());
        }
    };

    // Only now that the new URL is committed is the old asset orphaned
    if new_image_url.is_some() {
        if let Some(old_url) = &existing.image_url {
            let old_key = BlobClient::key_from_url(old_url);
            if let Err(cleanup_error) = blob_client.delete(old_key).await {
                tracing::error!("Failed to delete replaced asset: {:?}", cleanup_error);
            }
        }
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Product updated successfully",
        "product": ProductSummary::from(updated)
    })))
}

async fn cleanup_new_upload(blob_client: &BlobClient, new_image_url: &Option<String>) {
    if let Some(url) = new_image_url {
        let key = BlobClient::key_from_url(url);
        if let Err(cleanup_error) = blob_client.delete(key).await {
            tracing::error!("Failed to clean up new image: {:?}", cleanup_error);
        }
    }
}
