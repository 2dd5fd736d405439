use std::{error::Error, fmt::Debug, time::Duration};

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

use crate::{configuration::AuthSettings, utils::error_fmt_chain};

// Client for the token authority's password-login endpoint
#[derive(Clone)]
pub struct IdentityClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Error)]
pub enum LoginError {
    #[error("Authentication failed. Check your credentials.")]
    AuthenticationFailed,
    #[error("Failed to reach the token authority")]
    ProviderError(#[from] reqwest::Error),
}

impl Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    client_id: &'a str,
    username: &'a str,
    password: &'a str,
}

impl IdentityClient {
    pub fn new(settings: &AuthSettings) -> IdentityClient {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .unwrap();

        Self {
            http_client,
            base_url: settings.issuer_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }

    // Returns the provider's authentication result verbatim; the token
    // format is the authority's business, not ours.
    #[tracing::instrument(
        "Logging in against the token authority",
        skip(self, password)
    )]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<serde_json::Value, LoginError> {
        let url = format!("{}/login", self.base_url);
        let request_body = LoginRequest {
            client_id: &self.client_id,
            username,
            password: password.expose_secret(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&request_body)
            .bearer_auth(self.client_secret.expose_secret())
            .send()
            .await?
            .error_for_status()
            .map_err(|_| LoginError::AuthenticationFailed)?;

        let body = response.json::<serde_json::Value>().await?;

        match body.get("AuthenticationResult") {
            Some(result) => Ok(result.clone()),
            None => Err(LoginError::AuthenticationFailed),
        }
    }
}
