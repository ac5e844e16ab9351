//! Database migration commands.
//!
//! Applies the `shop` schema migrations from `crates/storefront/migrations/`
//! and creates the `tower_sessions` table used by the session store.

use tower_sessions_sqlx_store::PostgresStore;

use corner_shop_storefront::db;

use super::{CommandError, connect};

/// Run every migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CommandError::SessionStore(e.to_string()))?;

    tracing::info!("Migrations complete!");
    Ok(())
}
