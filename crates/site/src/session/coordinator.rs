//! Keeps [`SessionState`] consistent with the identity provider.
//!
//! The coordinator reacts to sign-in / sign-out transitions by resolving the
//! matching profile (creating it on first sign-in, bootstrapping the first
//! administrator) and reloading the site settings.
//!
//! # Superseding
//!
//! Every identity transition takes a new generation ticket. A profile
//! result is only applied while its ticket is still the latest *and* the
//! session still shows the identity it was fetched for, so a slow sync for
//! a previous identity can never overwrite a newer one. Settings refreshes
//! carry their own ticket. [`SessionProfileCoordinator::spawn`] additionally
//! aborts the superseded task so stale requests stop early.
//!
//! # Failure handling
//!
//! Nothing here returns an error. Store failures are logged and collapse
//! into an absent profile or absent settings, which the UI renders as a
//! degraded state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use ritwrites_core::{Identity, NewProfile, Profile, ProfileId, SiteSettings};

use super::SessionState;
use crate::identity::{IdentityProvider, IdentitySubscription};
use crate::store::{ProfileStore, SettingsStore, StoreError};

/// Owner and single writer of the client's [`SessionState`].
pub struct SessionProfileCoordinator {
    profiles: Arc<dyn ProfileStore>,
    settings: Arc<dyn SettingsStore>,
    state: watch::Sender<SessionState>,
    identity_generation: AtomicU64,
    settings_generation: AtomicU64,
}

impl std::fmt::Debug for SessionProfileCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProfileCoordinator")
            .field("state", &*self.state.borrow())
            .field(
                "identity_generation",
                &self.identity_generation.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

impl SessionProfileCoordinator {
    /// Create a coordinator with an empty session.
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, settings: Arc<dyn SettingsStore>) -> Self {
        let (state, _rx) = watch::channel(SessionState::default());
        Self {
            profiles,
            settings,
            state,
            identity_generation: AtomicU64::new(0),
            settings_generation: AtomicU64::new(0),
        }
    }

    /// Observe every published state change.
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Load the initial session: the provider's current identity (and its
    /// profile) concurrently with the site settings.
    ///
    /// A provider failure is treated as signed out.
    #[instrument(skip_all)]
    pub async fn initialize(&self, provider: &dyn IdentityProvider) {
        let ticket = self.next_identity_ticket();

        let load_identity = async {
            let identity = match provider.current_identity().await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(error = %e, "Could not read current identity, treating as signed out");
                    None
                }
            };
            self.transition(ticket, identity).await;
        };

        tokio::join!(load_identity, self.refresh_settings());
    }

    /// React to a sign-in, sign-out or token refresh.
    ///
    /// Supersedes any sync still running for an earlier transition, then
    /// reloads the settings.
    pub async fn on_identity_changed(&self, identity: Option<Identity>) {
        let ticket = self.next_identity_ticket();
        self.transition(ticket, identity).await;
        self.refresh_settings().await;
    }

    /// Resolve the profile for `id` and apply it if `id` is still the
    /// signed-in identity.
    ///
    /// Creates the profile when none exists; the first one ever created
    /// becomes the administrator. Returns the resolved profile whether or
    /// not it was applied.
    pub async fn sync_profile(&self, id: ProfileId) -> Option<Profile> {
        let ticket = self.identity_generation.load(Ordering::SeqCst);
        let profile = self.resolve_profile(id).await;
        self.apply_profile(ticket, id, profile.clone());
        profile
    }

    /// Reload the settings singleton.
    ///
    /// A failed or empty read publishes `settings = None`. If refreshes
    /// overlap, the most recently started one wins.
    #[instrument(skip_all)]
    pub async fn refresh_settings(&self) -> Option<SiteSettings> {
        let ticket = self.settings_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let settings = match self.settings.get_singleton_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Failed to load site settings");
                None
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if self.settings_generation.load(Ordering::SeqCst) != ticket {
                return false;
            }
            state.settings.clone_from(&settings);
            true
        });
        if !applied {
            debug!(ticket, "Discarded settings from superseded refresh");
        }

        settings
    }

    /// Drive the coordinator from a provider in a background task.
    ///
    /// Subscribes before loading the initial identity so no transition is
    /// missed. Each transition aborts the one still running.
    #[must_use]
    pub fn spawn(self: &Arc<Self>, provider: Arc<dyn IdentityProvider>) -> CoordinatorTask {
        let subscription = provider.subscribe();
        let coordinator = Arc::clone(self);

        let driver = tokio::spawn(async move {
            let initial = {
                let coordinator = Arc::clone(&coordinator);
                tokio::spawn(async move { coordinator.initialize(provider.as_ref()).await })
            };
            coordinator.run(subscription, Some(initial)).await;
        });

        CoordinatorTask { driver }
    }

    async fn run(
        self: Arc<Self>,
        mut subscription: IdentitySubscription,
        initial: Option<JoinHandle<()>>,
    ) {
        let mut in_flight = initial.map(AbortOnDrop);

        while let Some(identity) = subscription.changed().await {
            debug!(signed_in = identity.is_some(), "Identity transition");
            let coordinator = Arc::clone(&self);
            // Replacing the guard aborts the superseded transition.
            in_flight = Some(AbortOnDrop(tokio::spawn(async move {
                coordinator.on_identity_changed(identity).await;
            })));
        }

        info!("Identity provider closed, coordinator stopping");
        if let Some(mut last) = in_flight.take() {
            let _ = (&mut last.0).await;
        }
    }

    fn next_identity_ticket(&self) -> u64 {
        self.identity_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.identity_generation.load(Ordering::SeqCst) == ticket
    }

    /// Publish `identity` and, if signed in, sync its profile.
    async fn transition(&self, ticket: u64, identity: Option<Identity>) {
        let next_id = identity.as_ref().map(|i| i.id);

        let published = self.state.send_if_modified(|state| {
            if !self.is_current(ticket) {
                return false;
            }
            let previous_id = state.identity.as_ref().map(|i| i.id);
            if previous_id != next_id {
                state.profile = None;
            }
            state.identity = identity;
            true
        });
        if !published {
            debug!(ticket, "Transition superseded before publishing");
            return;
        }

        let Some(id) = next_id else {
            info!("Signed out");
            return;
        };

        let profile = self.resolve_profile(id).await;
        self.apply_profile(ticket, id, profile);
    }

    fn apply_profile(&self, ticket: u64, id: ProfileId, profile: Option<Profile>) {
        let applied = self.state.send_if_modified(|state| {
            let signed_in_as = state.identity.as_ref().map(|i| i.id);
            if !self.is_current(ticket) || signed_in_as != Some(id) {
                return false;
            }
            state.profile = profile;
            true
        });

        if applied {
            debug!(profile_id = %id, "Applied profile");
        } else {
            debug!(profile_id = %id, ticket, "Discarded profile from superseded sync");
        }
    }

    /// Read the profile for `id`, creating it if missing.
    #[instrument(skip_all, fields(profile_id = %id))]
    async fn resolve_profile(&self, id: ProfileId) -> Option<Profile> {
        match self.profiles.get_profile(id).await {
            Ok(Some(profile)) => return Some(profile),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                return None;
            }
        }

        let admin_exists = match self.profiles.any_admin_exists().await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(error = %e, "Could not check for an administrator, profile not created");
                return None;
            }
        };

        let is_admin = !admin_exists;
        match self.profiles.create_profile(NewProfile { id, is_admin }).await {
            Ok(profile) => {
                info!(is_admin = profile.is_admin, "Created profile on first sign-in");
                Some(profile)
            }
            Err(StoreError::Conflict(reason)) => {
                warn!(%reason, is_admin, "Profile creation conflicted");
                self.recover_from_conflict(id, is_admin).await
            }
            Err(e) => {
                warn!(error = %e, "Failed to create profile");
                None
            }
        }
    }

    /// A conflicting insert means either this identity's row was created
    /// concurrently, or another identity won the administrator bootstrap.
    async fn recover_from_conflict(
        &self,
        id: ProfileId,
        attempted_admin: bool,
    ) -> Option<Profile> {
        match self.profiles.get_profile(id).await {
            Ok(Some(profile)) => return Some(profile),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to re-read profile after conflict");
                return None;
            }
        }

        if !attempted_admin {
            return None;
        }

        match self
            .profiles
            .create_profile(NewProfile { id, is_admin: false })
            .await
        {
            Ok(profile) => {
                info!("Lost administrator bootstrap, created regular profile");
                Some(profile)
            }
            Err(e) => {
                warn!(error = %e, "Failed to create profile after conflict");
                None
            }
        }
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handle to a coordinator driven by [`SessionProfileCoordinator::spawn`].
#[derive(Debug)]
pub struct CoordinatorTask {
    driver: JoinHandle<()>,
}

impl CoordinatorTask {
    /// Whether the driver has stopped (the provider closed or it was shut down).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }

    /// Unsubscribe and abort any sync in progress.
    pub async fn shutdown(self) {
        self.driver.abort();
        let _ = self.driver.await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::memory::{MemoryIdentityProvider, MemoryProfileStore, MemorySettingsStore};
    use crate::session::SessionPhase;

    struct Harness {
        profiles: Arc<MemoryProfileStore>,
        settings: Arc<MemorySettingsStore>,
        coordinator: Arc<SessionProfileCoordinator>,
    }

    fn harness() -> Harness {
        let profiles = Arc::new(MemoryProfileStore::new());
        let settings = Arc::new(MemorySettingsStore::new());
        let coordinator = Arc::new(SessionProfileCoordinator::new(
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&settings) as Arc<dyn SettingsStore>,
        ));
        Harness {
            profiles,
            settings,
            coordinator,
        }
    }

    fn identity() -> Identity {
        Identity::new(ProfileId::random(), None)
    }

    fn existing_profile(id: ProfileId, is_admin: bool) -> Profile {
        Profile {
            id,
            full_name: Some("Existing".to_owned()),
            is_admin,
            created_at: Utc::now(),
        }
    }

    async fn wait_for(
        rx: &mut watch::Receiver<SessionState>,
        f: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .unwrap()
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_first_sign_in_bootstraps_admin() {
        let h = harness();
        let user = identity();

        h.coordinator.on_identity_changed(Some(user.clone())).await;

        let state = h.coordinator.snapshot();
        let profile = state.profile.unwrap();
        assert_eq!(profile.id, user.id);
        assert!(profile.is_admin);
        assert_eq!(h.profiles.admins().len(), 1);
    }

    #[tokio::test]
    async fn test_later_sign_in_is_not_admin() {
        let h = harness();
        h.profiles.insert(existing_profile(ProfileId::random(), true));

        let user = identity();
        h.coordinator.on_identity_changed(Some(user.clone())).await;

        let profile = h.coordinator.snapshot().profile.unwrap();
        assert_eq!(profile.id, user.id);
        assert!(!profile.is_admin);
        assert_eq!(h.profiles.admins().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_profile_is_read_not_created() {
        let h = harness();
        let user = identity();
        h.profiles.insert(existing_profile(user.id, false));

        h.coordinator.on_identity_changed(Some(user.clone())).await;

        assert_eq!(
            h.coordinator.snapshot().profile.unwrap().full_name.as_deref(),
            Some("Existing")
        );
        assert_eq!(h.profiles.len(), 1);
        assert_eq!(h.profiles.calls(), 1);
    }

    #[tokio::test]
    async fn test_sync_profile_is_idempotent() {
        let h = harness();
        let user = identity();
        h.coordinator.on_identity_changed(Some(user.clone())).await;
        let first = h.coordinator.snapshot().profile.unwrap();

        let again = h.coordinator.sync_profile(user.id).await.unwrap();

        assert_eq!(again, first);
        assert_eq!(h.coordinator.snapshot().profile.unwrap(), first);
        assert_eq!(h.profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_profile_without_store_calls() {
        let h = harness();
        h.coordinator.on_identity_changed(Some(identity())).await;
        let calls_before = h.profiles.calls();
        let settings_calls_before = h.settings.calls();

        h.coordinator.on_identity_changed(None).await;

        let state = h.coordinator.snapshot();
        assert_eq!(state.identity, None);
        assert_eq!(state.profile, None);
        assert_eq!(state.phase(), SessionPhase::Unauthenticated);
        assert_eq!(h.profiles.calls(), calls_before);
        assert_eq!(h.settings.calls(), settings_calls_before + 1);
    }

    #[tokio::test]
    async fn test_store_failure_yields_absent_profile() {
        let h = harness();
        h.profiles.set_unavailable(true);
        let user = identity();

        h.coordinator.on_identity_changed(Some(user.clone())).await;

        let state = h.coordinator.snapshot();
        assert_eq!(state.identity, Some(user));
        assert_eq!(state.profile, None);
        assert_eq!(state.phase(), SessionPhase::SyncingProfile);
    }

    #[tokio::test]
    async fn test_admin_check_failure_creates_nothing() {
        let h = harness();
        h.profiles.set_admin_check_unavailable(true);

        h.coordinator.on_identity_changed(Some(identity())).await;

        assert_eq!(h.coordinator.snapshot().profile, None);
        assert!(h.profiles.is_empty());
    }

    #[tokio::test]
    async fn test_failed_resync_clears_stale_profile() {
        let h = harness();
        let user = identity();
        h.coordinator.on_identity_changed(Some(user.clone())).await;
        assert!(h.coordinator.snapshot().profile.is_some());

        h.profiles.set_unavailable(true);
        assert_eq!(h.coordinator.sync_profile(user.id).await, None);
        assert_eq!(h.coordinator.snapshot().profile, None);
    }

    #[tokio::test]
    async fn test_superseded_sync_is_discarded() {
        let h = harness();
        let a = identity();
        let b = identity();
        h.profiles.insert(existing_profile(a.id, false));
        h.profiles.insert(existing_profile(b.id, true));
        let gate = h.profiles.hold_reads(a.id);

        let coordinator = Arc::clone(&h.coordinator);
        let first = {
            let a = a.clone();
            tokio::spawn(async move { coordinator.on_identity_changed(Some(a)).await })
        };
        while h.profiles.calls() == 0 {
            tokio::task::yield_now().await;
        }

        h.coordinator.on_identity_changed(Some(b.clone())).await;
        gate.release();
        first.await.unwrap();

        let state = h.coordinator.snapshot();
        assert_eq!(state.identity, Some(b.clone()));
        assert_eq!(state.profile.unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_sync_for_other_identity_is_not_applied() {
        let h = harness();
        let signed_in = identity();
        h.coordinator.on_identity_changed(Some(signed_in.clone())).await;

        let stranger = ProfileId::random();
        let resolved = h.coordinator.sync_profile(stranger).await;

        assert!(resolved.is_some());
        assert_eq!(h.coordinator.snapshot().profile.unwrap().id, signed_in.id);
    }

    #[tokio::test]
    async fn test_lost_bootstrap_falls_back_to_regular_profile() {
        struct StaleAdminCheck(Arc<MemoryProfileStore>);

        #[async_trait::async_trait]
        impl ProfileStore for StaleAdminCheck {
            async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
                self.0.get_profile(id).await
            }
            async fn any_admin_exists(&self) -> Result<bool, StoreError> {
                Ok(false)
            }
            async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
                self.0.create_profile(profile).await
            }
        }

        let store = Arc::new(MemoryProfileStore::new());
        let coordinator = SessionProfileCoordinator::new(
            Arc::new(StaleAdminCheck(Arc::clone(&store))),
            Arc::new(MemorySettingsStore::new()),
        );

        let winner = identity();
        coordinator.on_identity_changed(Some(winner.clone())).await;
        let loser = identity();
        coordinator.on_identity_changed(Some(loser.clone())).await;

        let profile = coordinator.snapshot().profile.unwrap();
        assert_eq!(profile.id, loser.id);
        assert!(!profile.is_admin);
        let admins = store.admins();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, winner.id);
    }

    #[tokio::test]
    async fn test_settings_absent_and_present() {
        let h = harness();
        assert_eq!(h.coordinator.refresh_settings().await, None);
        assert_eq!(h.coordinator.snapshot().settings, None);

        let settings = SiteSettings {
            site_name: "Rit Writes".to_owned(),
            ..Default::default()
        };
        h.settings.set(Some(settings.clone()));
        h.coordinator.refresh_settings().await;
        assert_eq!(h.coordinator.snapshot().settings, Some(settings));

        h.settings.set_unavailable(true);
        h.coordinator.refresh_settings().await;
        assert_eq!(h.coordinator.snapshot().settings, None);
    }

    #[tokio::test]
    async fn test_initialize_loads_identity_and_settings() {
        let h = harness();
        h.settings.set(Some(SiteSettings {
            site_name: "Rit Writes".to_owned(),
            ..Default::default()
        }));
        let provider = MemoryIdentityProvider::new();
        let user = identity();
        provider.sign_in(user.clone());

        h.coordinator.initialize(&provider).await;

        let state = h.coordinator.snapshot();
        assert_eq!(state.identity, Some(user));
        assert!(state.is_admin());
        assert_eq!(state.site_name("ritwrites"), "Rit Writes");
    }

    #[tokio::test]
    async fn test_initialize_with_unavailable_provider_is_signed_out() {
        let h = harness();
        let provider = MemoryIdentityProvider::new();
        provider.set_unavailable(true);

        h.coordinator.initialize(&provider).await;

        assert_eq!(h.coordinator.snapshot().phase(), SessionPhase::Unauthenticated);
        assert_eq!(h.profiles.calls(), 0);
        assert_eq!(h.settings.calls(), 1);
    }

    #[tokio::test]
    async fn test_spawned_coordinator_follows_provider() {
        let h = harness();
        let provider = Arc::new(MemoryIdentityProvider::new());
        let mut rx = h.coordinator.observe();
        let task = h
            .coordinator
            .spawn(Arc::clone(&provider) as Arc<dyn IdentityProvider>);

        let user = identity();
        provider.sign_in(user.clone());
        let state = wait_for(&mut rx, |s| s.profile.as_ref().is_some_and(|p| p.id == user.id)).await;
        assert!(state.is_admin());

        provider.sign_out();
        wait_for(&mut rx, |s| s.identity.is_none()).await;
        assert_eq!(h.coordinator.snapshot().profile, None);

        task.shutdown().await;
    }
}
