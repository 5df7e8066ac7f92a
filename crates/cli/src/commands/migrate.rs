//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rw-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RITWRITES_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/site/migrations/` and are embedded into
//! the binary at build time.

use ritwrites_site::config;
use ritwrites_site::db;

use super::CommandError;

/// Apply all pending migrations to the site database.
pub async fn run() -> Result<(), CommandError> {
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to site database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!(
        available = db::MIGRATOR.iter().count(),
        "Running site migrations..."
    );
    db::run_migrations(&pool).await?;

    tracing::info!("Site migrations complete!");
    Ok(())
}
