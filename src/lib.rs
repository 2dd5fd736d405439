pub mod routes;
pub mod startup;
pub mod configuration;
pub mod telemetry;
pub mod utils;
pub mod schema;
pub mod models;
pub mod auth;
pub mod identity_client;
pub mod blob_client;
pub mod db_interaction;
