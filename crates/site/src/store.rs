//! Contracts for the external profile and settings stores.
//!
//! The session coordinator only ever talks to these traits. Production uses
//! the Postgres implementations in [`crate::db`]; tests use
//! [`crate::memory`].
//!
//! A missing row is `Ok(None)`, never an error. [`StoreError`] is reserved
//! for the store being unreachable or refusing a write.

use async_trait::async_trait;
use thiserror::Error;

use ritwrites_core::{NewProfile, Profile, ProfileId, SiteSettings};

/// Errors returned by the external stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Network or service failure. Retrying later may succeed.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A storage-level constraint rejected the write.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A row exists but could not be mapped to a domain value.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Profile rows keyed by identity id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read the profile for an identity.
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, StoreError>;

    /// Whether any profile currently has `is_admin = true`.
    async fn any_admin_exists(&self) -> Result<bool, StoreError>;

    /// Insert a profile and return the stored row.
    ///
    /// Must fail with [`StoreError::Conflict`] if a row for the id already
    /// exists, or if the row would become a second bootstrap administrator.
    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError>;
}

/// The singleton site settings row.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the settings row, if one exists.
    async fn get_singleton_settings(&self) -> Result<Option<SiteSettings>, StoreError>;
}
