//! Profile repository.
//!
//! Implements [`ProfileStore`] for the session coordinator, plus the manual
//! admin management used by the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ritwrites_core::{NewProfile, Profile, ProfileId};

use super::{RepositoryError, map_unique_violation};
use crate::store::{ProfileStore, StoreError};

/// Internal row type for profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    full_name: Option<String>,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: ProfileId::new(row.id),
            full_name: row.full_name,
            is_admin: row.is_admin,
            created_at: row.created_at,
        }
    }
}

/// Postgres-backed profile store.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, full_name, is_admin, created_at
            FROM profiles
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List all profiles, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, full_name, is_admin, created_at
            FROM profiles
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a profile created on first sign-in.
    ///
    /// An admin row is flagged as the bootstrap administrator, so the
    /// `profiles_single_bootstrap_admin` index rejects a concurrent second one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id already exists or another
    /// bootstrap administrator was inserted first.
    pub async fn insert(&self, profile: NewProfile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO profiles (id, is_admin, bootstrap_admin)
            VALUES ($1, $2, $2)
            RETURNING id, full_name, is_admin, created_at
            ",
        )
        .bind(profile.id)
        .bind(profile.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "profile already exists"))?;

        Ok(row.into())
    }

    /// Whether at least one admin profile exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn admin_exists(&self) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE is_admin)")
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Promote or demote a profile.
    ///
    /// Demotion also clears the bootstrap flag, so a later first sign-in can
    /// bootstrap again once no admin is left. Promotion never sets it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no profile has this id.
    pub async fn set_admin(&self, id: ProfileId, is_admin: bool) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            UPDATE profiles
            SET is_admin = $2,
                bootstrap_admin = bootstrap_admin AND $2
            WHERE id = $1
            RETURNING id, full_name, is_admin, created_at
            ",
        )
        .bind(id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tracing::info!(profile_id = %id, is_admin, "Profile admin flag updated");
        Ok(row.into())
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, StoreError> {
        Ok(self.get_by_id(id).await?)
    }

    async fn any_admin_exists(&self) -> Result<bool, StoreError> {
        Ok(self.admin_exists().await?)
    }

    async fn create_profile(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        Ok(self.insert(profile).await?)
    }
}
