use std::net::TcpListener;

use actix_web::{dev::Server, error::InternalError, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use diesel::{r2d2::ConnectionManager, PgConnection};
use r2d2::Pool;
use tracing_actix_web::TracingLogger;

use crate::{
    auth::validator::TokenValidator,
    blob_client::BlobClient,
    configuration::{DatabaseSettings, Settings},
    identity_client::IdentityClient,
    routes::{
        authentication::login,
        health_check,
        orders::{get_order_detail, get_orders, post_order},
        products::{delete_product, get_product_detail, list_products, post_product, put_product},
    },
    utils::DbPool,
};

pub struct Application {
    pub host: String,
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn new(settings: Settings) -> Result<Application, anyhow::Error> {
        let pool = get_connection_pool(&settings.database)?;

        let token_validator = TokenValidator::new(&settings.auth);
        let identity_client = IdentityClient::new(&settings.auth);
        let blob_client = BlobClient::new(&settings.blob_store);

        let listener = TcpListener::bind((
            settings.application.host.as_str(),
            settings.application.port,
        ))?;
        let port = listener.local_addr()?.port();

        let server = run(listener, pool, token_validator, identity_client, blob_client)?;

        Ok(Application {
            host: settings.application.host,
            port,
            server,
        })
    }
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> Result<DbPool, anyhow::Error> {
    let manager = ConnectionManager::<PgConnection>::new(settings.get_database_table_url());

    Pool::builder()
        .build(manager)
        .context("Failed to build connection pool")
}

fn run(
    listener: TcpListener,
    pool: DbPool,
    token_validator: TokenValidator,
    identity_client: IdentityClient,
    blob_client: BlobClient,
) -> Result<Server, anyhow::Error> {
    let pool = web::Data::new(pool);
    let token_validator = web::Data::new(token_validator);
    let identity_client = web::Data::new(identity_client);
    let blob_client = web::Data::new(blob_client);

    // Undeserializable JSON bodies get the same {"error": ...} shape as the
    // route error enums instead of actix's plain-text default
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        let body = serde_json::json!({ "error": err.to_string() });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    });

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health", web::get().to(health_check))
            .service(web::scope("/auth").route("/login", web::post().to(login)))
            .service(
                web::scope("/products")
                    .route("/", web::get().to(list_products))
                    .route("/", web::post().to(post_product))
                    .route("/{product_id}", web::get().to(get_product_detail))
                    .route("/{product_id}", web::put().to(put_product))
                    .route("/{product_id}", web::delete().to(delete_product)),
            )
            .service(
                web::scope("/orders")
                    .route("/", web::get().to(get_orders))
                    .route("/", web::post().to(post_order))
                    .route("/{order_id}", web::get().to(get_order_detail)),
            )
            .app_data(json_config.clone())
            .app_data(pool.clone())
            .app_data(token_validator.clone())
            .app_data(identity_client.clone())
            .app_data(blob_client.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
