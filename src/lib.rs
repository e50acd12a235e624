#[macro_use]
extern crate rocket;

use error::BackendError;
use mongodb::Client;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::error::ConfigurationError;
use crate::route::mount_api;

pub mod config;
pub mod data;
pub mod error;
pub mod grade;
pub mod resp;
pub mod role;
pub mod route;
pub mod scope;
pub mod util;

/// Builds the configured rocket instance: config, MongoDB handle and CORS
/// attached, the whole API mounted. Pass `None` to leave the global logger
/// alone (tests install their own).
pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(level) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        };
    }

    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let config = match Config::load() {
        Ok(config) => config,
        Err(ConfigurationError::NotFound(_)) => {
            let config = Config::default();
            if config.save().is_err() {
                tracing::warn!("Unable to save generated configuration.");
            }
            config
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            return Err(other.into());
        }
    };

    tracing::info!("Connecting to MongoDB: {}", config.mongodb_uri);
    let client = Client::with_uri_str(config.mongodb_uri.as_str()).await?;

    tracing::info!("Using MongoDB database: {}", config.mongodb_db);
    let db = client.database(config.mongodb_db.as_str());

    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()
    .expect("static CORS options must be valid");

    let rocket = rocket::build().manage(config).manage(db).attach(cors);

    Ok(mount_api(rocket))
}
