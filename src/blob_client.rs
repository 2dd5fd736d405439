use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::configuration::BlobStoreSettings;

// Client to interact with the external object store
#[derive(Clone)]
pub struct BlobClient {
    http_client: Client,
    base_url: String,
    public_base_url: String,
    bucket: String,
    api_token: SecretString,
}

impl BlobClient {
    pub fn new(settings: &BlobStoreSettings) -> BlobClient {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .unwrap();

        Self {
            http_client,
            base_url: settings.base_url.clone(),
            public_base_url: settings.public_base_url.clone(),
            bucket: settings.bucket.clone(),
            api_token: settings.api_token.clone(),
        }
    }

    // Uploads under a generated-unique key so concurrent uploads of the
    // same filename never collide; returns the asset's public URL.
    #[tracing::instrument(
        "Uploading asset to blob store",
        skip(self, data)
    )]
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<String, reqwest::Error> {
        let key = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        let url = format!("{}/{}/{}", self.base_url, self.bucket, key);

        self.http_client
            .put(url)
            .header("Content-Type", content_type)
            .bearer_auth(self.api_token.expose_secret())
            .body(data)
            .send()
            .await?
            .error_for_status()?;

        Ok(format!("{}/{}", self.public_base_url, key))
    }

    #[tracing::instrument(
        "Deleting asset from blob store",
        skip(self)
    )]
    pub async fn delete(&self, key: &str) -> Result<(), reqwest::Error> {
        let url = format!("{}/{}/{}", self.base_url, self.bucket, key);

        self.http_client
            .delete(url)
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    // Asset keys are the last path segment of the stored public URL
    pub fn key_from_url(url: &str) -> &str {
        url.rsplit('/').next().unwrap_or(url)
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
