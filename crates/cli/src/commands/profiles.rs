//! Profile management commands.
//!
//! Profiles are created by the site on first sign-in; these commands only
//! inspect them and move the administrator flag around.
//!
//! # Usage
//!
//! ```bash
//! rw-cli profiles list
//! rw-cli profiles promote <profile-id>
//! rw-cli profiles demote <profile-id>
//! ```

use ritwrites_core::ProfileId;
use ritwrites_site::config;
use ritwrites_site::db::{self, PgProfileStore};

use super::{CommandError, print_json};

async fn store() -> Result<PgProfileStore, CommandError> {
    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    Ok(PgProfileStore::new(pool))
}

/// Print every profile, oldest first.
pub async fn list() -> Result<(), CommandError> {
    let profiles = store().await?.list_all().await?;

    let admins = profiles.iter().filter(|p| p.is_admin).count();
    tracing::info!(total = profiles.len(), admins, "Profiles loaded");
    if admins == 0 && !profiles.is_empty() {
        tracing::warn!("No administrator left, the next new sign-in will become one");
    }

    print_json(&profiles)
}

/// Grant or revoke administrator access.
pub async fn set_admin(id: ProfileId, is_admin: bool) -> Result<(), CommandError> {
    let profile = store().await?.set_admin(id, is_admin).await?;
    print_json(&profile)
}
