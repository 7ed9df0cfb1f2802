//! Database migration command.
//!
//! Applies the embedded migrations from `crates/storefront/migrations/` and
//! creates the `tower_sessions.session` table used by the session store.
//! The server never migrates on start.

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Run all shop migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running shop migrations...");
    boutique_storefront::db::run_migrations(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
