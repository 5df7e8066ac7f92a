//! Database operations for the site's `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `profiles` - One row per identity, with the admin flag
//! - `site_settings` - The singleton site configuration row
//! - `posts` - Blog posts
//! - `comments` - Reader comments on posts
//! - `portfolio` - Portfolio projects
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p ritwrites-cli -- migrate
//! ```

pub mod comments;
pub mod portfolio;
pub mod posts;
pub mod profiles;
pub mod settings;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::store::StoreError;

pub use comments::CommentRepository;
pub use portfolio::PortfolioRepository;
pub use posts::PostRepository;
pub use profiles::PgProfileStore;
pub use settings::PgSettingsStore;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for StoreError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::DataCorruption(msg) => Self::DataCorruption(msg),
            RepositoryError::NotFound => Self::DataCorruption("row vanished".to_owned()),
            RepositoryError::Database(e) => Self::Unavailable(e.to_string()),
        }
    }
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!(
            "{what} ({})",
            db_err.constraint().unwrap_or("unique")
        ));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply any pending migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails or the history diverges.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
