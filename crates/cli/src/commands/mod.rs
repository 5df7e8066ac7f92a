//! CLI subcommands.

pub mod auth;
pub mod migrate;
pub mod profiles;
pub mod session;
pub mod settings;

use serde::Serialize;
use thiserror::Error;

use ritwrites_site::config::{ConfigError, SiteConfig};
use ritwrites_site::db::{self, RepositoryError};
use ritwrites_site::identity::AuthError;
use ritwrites_site::services::ServiceError;
use ritwrites_site::state::AppState;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Auth service error: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Load the full configuration and connect everything the site uses.
async fn connect_site() -> Result<AppState, CommandError> {
    let config = SiteConfig::from_env()?;

    tracing::info!("Connecting to site database...");
    let pool = db::create_pool(&config.database_url).await?;

    Ok(AppState::new(config, pool)?)
}

/// Pretty-print a value as JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
