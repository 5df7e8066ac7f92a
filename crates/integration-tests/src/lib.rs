//! Integration tests for ritwrites.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ritwrites-integration-tests
//! ```
//!
//! The scenarios run the real session coordinator against the in-memory
//! stores, and against a mocked auth API where the HTTP path matters. No
//! database is needed, except for `postgres_stores`, whose tests are
//! ignored unless run with `--ignored` and `RITWRITES_TEST_DATABASE_URL`.
//!
//! # Test Categories
//!
//! - `session_bootstrap` - first-admin bootstrap and profile creation
//! - `session_supersede` - overlapping identity transitions
//! - `settings_refresh` - settings loading and administrator updates
//! - `auth_flow` - sign-in through the mocked auth API
//! - `postgres_stores` - storage constraints, settings upsert and likes

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use ritwrites_core::{Identity, Profile, ProfileId, SiteSettings};
use ritwrites_site::identity::IdentityProvider;
use ritwrites_site::memory::{MemoryIdentityProvider, MemoryProfileStore, MemorySettingsStore};
use ritwrites_site::session::{CoordinatorTask, SessionProfileCoordinator, SessionState};
use ritwrites_site::store::{ProfileStore, SettingsStore};

/// One client session wired to shared in-memory stores.
pub struct TestSite {
    pub profiles: Arc<MemoryProfileStore>,
    pub settings: Arc<MemorySettingsStore>,
    pub provider: Arc<MemoryIdentityProvider>,
    pub coordinator: Arc<SessionProfileCoordinator>,
}

impl TestSite {
    /// A fresh site with empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(MemoryProfileStore::new()),
            Arc::new(MemorySettingsStore::new()),
        )
    }

    /// Another client of the same backend, with its own provider and session.
    #[must_use]
    pub fn with_stores(
        profiles: Arc<MemoryProfileStore>,
        settings: Arc<MemorySettingsStore>,
    ) -> Self {
        let coordinator = Arc::new(SessionProfileCoordinator::new(
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
        ));
        Self {
            profiles,
            settings,
            provider: Arc::new(MemoryIdentityProvider::new()),
            coordinator,
        }
    }

    /// Start following the provider in the background.
    #[must_use]
    pub fn start(&self) -> CoordinatorTask {
        self.coordinator
            .spawn(Arc::clone(&self.provider) as Arc<dyn IdentityProvider>)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.coordinator.snapshot()
    }
}

impl Default for TestSite {
    fn default() -> Self {
        Self::new()
    }
}

/// A new identity with no profile yet.
#[must_use]
pub fn new_identity() -> Identity {
    Identity::new(ProfileId::random(), None)
}

/// A stored profile row.
#[must_use]
pub fn stored_profile(id: ProfileId, is_admin: bool) -> Profile {
    Profile {
        id,
        full_name: None,
        is_admin,
        created_at: Utc::now(),
    }
}

#[must_use]
pub fn settings_named(name: &str) -> SiteSettings {
    SiteSettings {
        site_name: name.to_owned(),
        ..SiteSettings::default()
    }
}

/// Wait until the session satisfies `predicate`.
///
/// # Panics
///
/// Panics if the condition is not reached within five seconds.
#[allow(clippy::expect_used)]
pub async fn wait_for(
    rx: &mut watch::Receiver<SessionState>,
    predicate: impl FnMut(&SessionState) -> bool,
) -> SessionState {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("session did not reach the expected state in time")
        .expect("coordinator dropped")
        .clone()
}
