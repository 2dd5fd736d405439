use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;

use crate::{
    auth::extractors::AuthenticatedUser,
    db_interaction::{place_order, CartItem, PlaceOrderError},
    utils::{error_fmt_chain, get_pooled_connection, DbPool},
};

#[derive(Error)]
pub enum PostOrderError {
    #[error("Order must include a list of items")]
    MalformedCart,
    #[error(transparent)]
    OrderError(#[from] PlaceOrderError),
    #[error("Failed due to internal server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for PostOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for PostOrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            PostOrderError::MalformedCart => StatusCode::BAD_REQUEST,
            PostOrderError::OrderError(inner) => match inner {
                PlaceOrderError::EmptyCart
                | PlaceOrderError::InvalidItem { .. }
                | PlaceOrderError::ProductDeleted(_)
                | PlaceOrderError::InsufficientStock(_) => StatusCode::BAD_REQUEST,
                PlaceOrderError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                PlaceOrderError::ThreadpoolError(_) | PlaceOrderError::RunQueryError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            PostOrderError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[tracing::instrument(
    "Posting order",
    skip(pool, user, body)
)]
pub async fn post_order(
    pool: web::Data<DbPool>,
    body: web::Json<serde_json::Value>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, PostOrderError> {
    // The items value must be a JSON array of cart entries; anything else
    // (missing, null, a string) is rejected before touching the database
    let cart: Vec<CartItem> = match body.into_inner().get("items") {
        Some(items @ serde_json::Value::Array(_)) => {
            serde_json::from_value(items.clone()).map_err(|_| PostOrderError::MalformedCart)?
        }
        _ => return Err(PostOrderError::MalformedCart),
    };

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let order = place_order(conn, user.0.sub, cart).await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "Order created successfully",
        "order": order
    })))
}
