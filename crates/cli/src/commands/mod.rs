//! Subcommand implementations.

pub mod cart;
pub mod migrate;
pub mod seed;
pub mod user;

use boutique_core::CurrencyCode;
use boutique_storefront::db::{self, RepositoryError};
use boutique_storefront::services::auth::AuthError;
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Cannot read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No user with email {0}")]
    UnknownUser(String),

    #[error("{0} invalid product(s), nothing was inserted")]
    InvalidProducts(usize),
}

/// Connect to the shop database named by the environment.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to shop database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Currency the storefront prices products in.
pub fn currency() -> Result<CurrencyCode, CommandError> {
    std::env::var("STRIPE_CURRENCY")
        .unwrap_or_else(|_| "eur".to_owned())
        .parse()
        .map_err(|e| CommandError::InvalidEnvVar("STRIPE_CURRENCY", e))
}
