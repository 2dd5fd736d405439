use config::{Config, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub blob_store: BlobStoreSettings,
}

#[derive(Deserialize, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub name: String,
}

// Settings for the external token authority
#[derive(Deserialize, Debug)]
pub struct AuthSettings {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub audience: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Deserialize, Debug)]
pub struct BlobStoreSettings {
    pub base_url: String,
    pub public_base_url: String,
    pub bucket: String,
    pub api_token: SecretString,
    pub timeout_seconds: u64,
}

impl Settings {
    pub fn get() -> Self {
        let config = Config::builder()
            .add_source(File::with_name("configuration/base.yaml"))
            .build()
            .expect("Failed to get configuration")
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize to Settings struct");

        config
    }
}

impl DatabaseSettings {
    // Url of the postgres instance, without a database selected
    pub fn get_database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port
        )
    }

    pub fn get_database_table_url(&self) -> String {
        format!("{}/{}", self.get_database_url(), self.name)
    }
}
