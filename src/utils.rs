//! Shared plumbing for the storefront's Postgres-backed handlers: pool
//! aliases, checkout on the blocking pool, and error formatting helpers.

use std::{
    error::Error,
    fmt::{Debug, Display},
};

use actix_web::{error::InternalError, web, HttpResponse};
use diesel::{r2d2::ConnectionManager, PgConnection};
use r2d2::{Pool, PooledConnection};
use thiserror::Error;

use crate::telemetry::spawn_blocking_with_tracing;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn error_fmt_chain(f: &mut std::fmt::Formatter<'_>, source: &Option<impl Error>) -> std::fmt::Result{
    if let Some(error) = source{
        write!(f, "\n\tCaused By:\n\t")?;
        write!(f, "{:?}", &error)?;
        error_fmt_chain(f, &error.source())
    } else {
        Ok(())
    }
}

/// Pool checkout can block while the pool is saturated, so it runs on the
/// blocking threadpool with the request span attached.
pub async fn get_pooled_connection(
    pool: &web::Data<DbPool>
) -> Result<DbConnection, PoolGetError>{
    let pool_clone = pool.clone();

    let res = spawn_blocking_with_tracing(move || {
        pool_clone.get()
    })
    .await??;

    Ok(res)
}

/// 500 with the same `{"error": ...}` body shape the route error enums
/// produce. The cause is logged here; the response body stays generic.
pub fn e500_json<E>(error: E) -> actix_web::Error
where
    E: Debug + Display + 'static,
{
    tracing::error!("{:?}", error);

    InternalError::from_response(
        error,
        HttpResponse::InternalServerError()
            .json(serde_json::json!({ "error": "An unexpected error occurred" })),
    )
    .into()
}

#[derive(Error)]
pub enum PoolGetError{
    #[error("Failed due to threadpool error")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to get a storefront database connection from the pool")]
    DbPoolError(#[from] r2d2::Error),
}

impl Debug for PoolGetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}
