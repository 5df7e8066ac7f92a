//! Site settings commands.
//!
//! # Usage
//!
//! ```bash
//! rw-cli settings show
//! rw-cli settings set --access-token "$TOKEN" --name "Rit Writes" -d "Essays and projects"
//! ```

use secrecy::SecretString;

use ritwrites_core::SiteSettingsUpdate;
use ritwrites_site::config;
use ritwrites_site::db::{self, PgSettingsStore};

use super::{CommandError, connect_site, print_json};

/// Print the settings row, or `null` when none exists.
pub async fn show() -> Result<(), CommandError> {
    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;

    let settings = PgSettingsStore::new(pool).get().await?;
    if settings.is_none() {
        tracing::info!("No settings row yet, the site shows its default name");
    }
    print_json(&settings)
}

/// Save new settings as the administrator owning `access_token`.
pub async fn set(access_token: String, update: SiteSettingsUpdate) -> Result<(), CommandError> {
    let state = connect_site().await?;

    state
        .identity()
        .sign_in_with_token(SecretString::from(access_token))
        .await?;
    state.coordinator().initialize(state.identity()).await;

    let session = state.coordinator().snapshot();
    let saved = state.settings_service().save(&session, update).await?;

    tracing::info!(site_name = %saved.site_name, "Settings updated");
    print_json(&state.coordinator().snapshot().settings)
}
