use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    identity_client::{IdentityClient, LoginError},
    utils::error_fmt_chain,
};

#[derive(Deserialize, Debug)]
pub struct LoginBody {
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Error)]
pub enum LoginHandlerError {
    #[error("Username and password are required")]
    MissingCredentials,
    #[error(transparent)]
    ProviderError(#[from] LoginError),
}

impl Debug for LoginHandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for LoginHandlerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

// Identity is fully delegated; this just forwards the credential pair to
// the authority and hands its result back
#[tracing::instrument(
    "Logging in user",
    skip(identity_client, body)
)]
pub async fn login(
    identity_client: web::Data<IdentityClient>,
    body: web::Json<LoginBody>,
) -> Result<HttpResponse, LoginHandlerError> {
    let body = body.into_inner();

    let (username, password) = match (body.username, body.password) {
        (Some(username), Some(password)) if !username.is_empty() => (username, password),
        _ => return Err(LoginHandlerError::MissingCredentials),
    };

    let auth_result = identity_client.login(&username, &password).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": auth_result })))
}
