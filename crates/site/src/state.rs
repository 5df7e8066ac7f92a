//! Application state shared across the site's entry points.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::SiteConfig;
use crate::db::{PgProfileStore, PgSettingsStore};
use crate::identity::{AuthClient, AuthError, IdentityProvider, SupabaseIdentityProvider};
use crate::services::{ContentService, SettingsService};
use crate::session::{CoordinatorTask, SessionProfileCoordinator};
use crate::store::{ProfileStore, SettingsStore};

/// Application state shared across all callers.
///
/// This struct is cheaply cloneable via `Arc` and wires the Postgres stores
/// and the hosted auth provider into one session coordinator.
///
/// Implements `Debug` manually; secrets in the config are redacted.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    pool: PgPool,
    profiles: Arc<PgProfileStore>,
    settings: Arc<PgSettingsStore>,
    identity: Arc<SupabaseIdentityProvider>,
    coordinator: Arc<SessionProfileCoordinator>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("pool_size", &self.inner.pool.size())
            .field("coordinator", &self.inner.coordinator)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the auth HTTP client cannot be built.
    pub fn new(config: SiteConfig, pool: PgPool) -> Result<Self, AuthError> {
        let identity = Arc::new(SupabaseIdentityProvider::new(AuthClient::new(
            &config.supabase,
        )?));
        let profiles = Arc::new(PgProfileStore::new(pool.clone()));
        let settings = Arc::new(PgSettingsStore::new(pool.clone()));
        let coordinator = Arc::new(SessionProfileCoordinator::new(
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                profiles,
                settings,
                identity,
                coordinator,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn profiles(&self) -> &PgProfileStore {
        &self.inner.profiles
    }

    #[must_use]
    pub fn settings_store(&self) -> &PgSettingsStore {
        &self.inner.settings
    }

    /// The hosted auth provider.
    #[must_use]
    pub fn identity(&self) -> &SupabaseIdentityProvider {
        &self.inner.identity
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<SessionProfileCoordinator> {
        &self.inner.coordinator
    }

    /// Start following the auth provider in the background.
    #[must_use]
    pub fn start_session(&self) -> CoordinatorTask {
        let provider = Arc::clone(&self.inner.identity) as Arc<dyn IdentityProvider>;
        self.inner.coordinator.spawn(provider)
    }

    #[must_use]
    pub fn content(&self) -> ContentService<'_> {
        ContentService::new(&self.inner.pool)
    }

    #[must_use]
    pub fn settings_service(&self) -> SettingsService<'_> {
        SettingsService::new(&self.inner.settings, &self.inner.coordinator)
    }
}
