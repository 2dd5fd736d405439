use std::{error::Error, fmt::Debug, str::FromStr};

use actix_multipart::form::{bytes::Bytes as UploadedFile, text::Text, MultipartForm};
use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use bigdecimal::BigDecimal;
use thiserror::Error;

use super::get::ProductSummary;
use crate::{
    auth::extractors::AdminUser,
    blob_client::BlobClient,
    db_interaction::{insert_product, ProductInsertError},
    models::NewProduct,
    utils::{error_fmt_chain, get_pooled_connection, DbPool},
};

#[derive(MultipartForm)]
pub struct CreateProductForm {
    pub name: Text<String>,
    pub description: Option<Text<String>>,
    pub price: Text<String>,
    pub stock: Text<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Error)]
pub enum CreateProductError {
    #[error("No image file provided")]
    MissingFile,
    #[error("{0}")]
    InvalidField(String),
    #[error("Failed to upload image to the blob store")]
    UploadError(#[from] reqwest::Error),
    #[error("Failed to create product")]
    InsertError(#[from] ProductInsertError),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CreateProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for CreateProductError {
    fn status_code(&self) -> StatusCode {
        match self {
            CreateProductError::MissingFile | CreateProductError::InvalidField(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

pub(super) fn parse_price(raw: &str) -> Result<BigDecimal, String> {
    let price = BigDecimal::from_str(raw)
        .map_err(|_| format!("Invalid price: {}", raw))?;

    if price < BigDecimal::from(0) {
        return Err(format!("Price must not be negative: {}", raw));
    }

    Ok(price)
}

pub(super) fn parse_stock(raw: &str) -> Result<i32, String> {
    let stock = raw
        .parse::<i32>()
        .map_err(|_| format!("Invalid stock: {}", raw))?;

    if stock < 0 {
        return Err(format!("Stock must not be negative: {}", raw));
    }

    Ok(stock)
}

// Upload-then-link: the asset goes to the blob store first and the row is
// inserted with the returned URL. A failed insert triggers a best-effort
// delete of the fresh asset so no orphan blobs accumulate.
#[tracing::instrument(
    "Creating product",
    skip(pool, blob_client, form)
)]
pub async fn post_product(
    pool: web::Data<DbPool>,
    blob_client: web::Data<BlobClient>,
    MultipartForm(form): MultipartForm<CreateProductForm>,
    _: AdminUser,
) -> Result<HttpResponse, CreateProductError> {
    let file = form.file.ok_or(CreateProductError::MissingFile)?;

    let name = form.name.into_inner();
    if name.trim().is_empty() {
        return Err(CreateProductError::InvalidField(
            "Product name must not be empty".to_string(),
        ));
    }

    let price = parse_price(&form.price).map_err(CreateProductError::InvalidField)?;
    let stock = parse_stock(&form.stock).map_err(CreateProductError::InvalidField)?;

    let file_name = file.file_name.unwrap_or_else(|| "upload".to_string());
    let content_type = file
        .content_type
        .map(|m| m.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let image_url = blob_client
        .upload(&file_name, &content_type, file.data)
        .await?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let new_product = NewProduct {
        name,
        description: form.description.map(|d| d.into_inner()),
        price,
        stock,
        image_url: Some(image_url.clone()),
    };

    let product = match insert_product(conn, new_product).await {
        Ok(product) => product,
        Err(e) => {
            let key = BlobClient::key_from_url(&image_url);
            if let Err(cleanup_error) = blob_client.delete(key).await {
                tracing::error!("Failed to clean up uploaded asset: {:?}", cleanup_error);
            }
            return Err(e.into());
        }
    };

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Product created successfully",
        "product": ProductSummary::from(product)
    })))
}
