//! Site settings database operations.
//!
//! The `site_settings` table holds at most one row (enforced by the
//! `site_settings_singleton` index).

use async_trait::async_trait;
use sqlx::PgPool;

use ritwrites_core::SiteSettings;

use super::{RepositoryError, map_unique_violation};
use crate::store::{SettingsStore, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct SettingsRow {
    site_name: String,
    site_description: Option<String>,
    logo_url: Option<String>,
    hero_image_url: Option<String>,
}

impl From<SettingsRow> for SiteSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            site_name: row.site_name,
            site_description: row.site_description,
            logo_url: row.logo_url,
            hero_image_url: row.hero_image_url,
        }
    }
}

/// Postgres-backed settings store.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    /// Create a store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the settings row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<Option<SiteSettings>, RepositoryError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r"
            SELECT site_name, site_description, logo_url, hero_image_url
            FROM site_settings
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Replace the settings row, creating it if none exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, settings: &SiteSettings) -> Result<SiteSettings, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, SettingsRow>(
            r"
            UPDATE site_settings
            SET site_name = $1,
                site_description = $2,
                logo_url = $3,
                hero_image_url = $4,
                updated_at = NOW()
            RETURNING site_name, site_description, logo_url, hero_image_url
            ",
        )
        .bind(&settings.site_name)
        .bind(&settings.site_description)
        .bind(&settings.logo_url)
        .bind(&settings.hero_image_url)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match updated {
            Some(row) => row,
            None => sqlx::query_as::<_, SettingsRow>(
                r"
                INSERT INTO site_settings (site_name, site_description, logo_url, hero_image_url)
                VALUES ($1, $2, $3, $4)
                RETURNING site_name, site_description, logo_url, hero_image_url
                ",
            )
            .bind(&settings.site_name)
            .bind(&settings.site_description)
            .bind(&settings.logo_url)
            .bind(&settings.hero_image_url)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, "settings row created concurrently"))?,
        };

        tx.commit().await?;
        Ok(row.into())
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get_singleton_settings(&self) -> Result<Option<SiteSettings>, StoreError> {
        Ok(self.get().await?)
    }
}
