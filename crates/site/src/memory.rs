//! In-memory stores and identity provider.
//!
//! These back the coordinator tests and offline CLI runs. The profile store
//! mirrors the Postgres constraints: duplicate ids and a second bootstrap
//! administrator are rejected with [`StoreError::Conflict`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use ritwrites_core::{Identity, NewProfile, Profile, ProfileId, SiteSettings};

use crate::identity::{IdentityChannel, IdentityProvider, IdentitySubscription};
use crate::store::{ProfileStore, SettingsStore, StoreError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("in-memory store switched off".to_owned())
}

#[derive(Debug, Default)]
struct ProfileRows {
    by_id: HashMap<ProfileId, Profile>,
    bootstrap_admin: Option<ProfileId>,
}

/// Profile store held in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    rows: Mutex<ProfileRows>,
    gates: Mutex<HashMap<ProfileId, Arc<Notify>>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
    admin_check_unavailable: AtomicBool,
}

/// Handle returned by [`MemoryProfileStore::hold_reads`].
#[derive(Debug, Clone)]
pub struct ReadGate {
    notify: Arc<Notify>,
}

impl ReadGate {
    /// Let the held read complete.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing profile row.
    pub fn insert(&self, profile: Profile) {
        lock(&self.rows).by_id.insert(profile.id, profile);
    }

    /// Every profile with the admin flag set.
    #[must_use]
    pub fn admins(&self) -> Vec<Profile> {
        lock(&self.rows)
            .by_id
            .values()
            .filter(|p| p.is_admin)
            .cloned()
            .collect()
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.rows).by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of trait calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Fail every call with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only `any_admin_exists`.
    pub fn set_admin_check_unavailable(&self, unavailable: bool) {
        self.admin_check_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// Block the next `get_profile` for `id` until the gate is released.
    #[must_use]
    pub fn hold_reads(&self, id: ProfileId) -> ReadGate {
        let notify = Arc::new(Notify::new());
        lock(&self.gates).insert(id, Arc::clone(&notify));
        ReadGate { notify }
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        self.enter()?;

        let gate = lock(&self.gates).remove(&id);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        Ok(lock(&self.rows).by_id.get(&id).cloned())
    }

    async fn any_admin_exists(&self) -> Result<bool, StoreError> {
        self.enter()?;
        if self.admin_check_unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(lock(&self.rows).by_id.values().any(|p| p.is_admin))
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        self.enter()?;

        let mut rows = lock(&self.rows);
        if rows.by_id.contains_key(&profile.id) {
            return Err(StoreError::Conflict("profiles_pkey".to_owned()));
        }
        if profile.is_admin {
            if rows.bootstrap_admin.is_some() {
                return Err(StoreError::Conflict(
                    "profiles_single_bootstrap_admin".to_owned(),
                ));
            }
            rows.bootstrap_admin = Some(profile.id);
        }

        let stored = Profile {
            id: profile.id,
            full_name: None,
            is_admin: profile.is_admin,
            created_at: Utc::now(),
        };
        rows.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

/// Settings store holding at most one row.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    row: Mutex<Option<SiteSettings>>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(settings: SiteSettings) -> Self {
        let store = Self::default();
        store.set(Some(settings));
        store
    }

    /// Replace (or remove) the settings row.
    pub fn set(&self, settings: Option<SiteSettings>) {
        *lock(&self.row) = settings;
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_singleton_settings(&self) -> Result<Option<SiteSettings>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(lock(&self.row).clone())
    }
}

/// Identity provider driven by explicit sign-in / sign-out calls.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    channel: IdentityChannel,
    unavailable: AtomicBool,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        self.channel.publish(Some(identity));
    }

    pub fn sign_out(&self) {
        self.channel.publish(None);
    }

    /// Fail `current_identity` with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.channel.latest())
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.channel.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_store_rejects_duplicate_id() {
        let store = MemoryProfileStore::new();
        let id = ProfileId::random();

        store
            .create_profile(NewProfile { id, is_admin: false })
            .await
            .unwrap();
        let err = store
            .create_profile(NewProfile { id, is_admin: false })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_store_rejects_second_bootstrap_admin() {
        let store = MemoryProfileStore::new();
        store
            .create_profile(NewProfile {
                id: ProfileId::random(),
                is_admin: true,
            })
            .await
            .unwrap();

        let err = store
            .create_profile(NewProfile {
                id: ProfileId::random(),
                is_admin: true,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.admins().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_counts_calls() {
        let store = MemoryProfileStore::new();
        store.set_unavailable(true);

        assert!(store.any_admin_exists().await.is_err());
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_settings_store_absent_row() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.get_singleton_settings().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_provider_reports_latest_identity() {
        let provider = MemoryIdentityProvider::new();
        let identity = Identity::new(ProfileId::random(), None);
        provider.sign_in(identity.clone());

        assert_eq!(provider.current_identity().await.unwrap(), Some(identity));
        provider.sign_out();
        assert_eq!(provider.current_identity().await.unwrap(), None);
    }
}
