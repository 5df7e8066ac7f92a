//! Site settings updates from the admin area.

use tracing::info;

use ritwrites_core::{SiteSettings, SiteSettingsUpdate};

use super::ServiceError;
use super::access::require_admin;
use crate::db::PgSettingsStore;
use crate::session::{SessionProfileCoordinator, SessionState};

/// Writes the settings singleton and republishes it to the session.
pub struct SettingsService<'a> {
    store: &'a PgSettingsStore,
    coordinator: &'a SessionProfileCoordinator,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(store: &'a PgSettingsStore, coordinator: &'a SessionProfileCoordinator) -> Self {
        Self { store, coordinator }
    }

    /// Save the settings and refresh the coordinator so observers see them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` unless the session is an administrator,
    /// `ServiceError::Validation` if the site name is blank, and
    /// `ServiceError::Repository` if the write fails.
    pub async fn save(
        &self,
        session: &SessionState,
        update: SiteSettingsUpdate,
    ) -> Result<SiteSettings, ServiceError> {
        let admin = require_admin(session)?;
        let settings = update.validate()?;

        let saved = self
            .store
            .save(&settings)
            .await
            .map_err(|e| ServiceError::from_repository(e, "settings"))?;

        info!(profile_id = %admin.id, site_name = %saved.site_name, "Site settings saved");
        self.coordinator.refresh_settings().await;
        Ok(saved)
    }
}
