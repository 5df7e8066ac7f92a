//! Portfolio project repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ritwrites_core::{PortfolioProject, ProjectDraft, ProjectId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    title: String,
    description: String,
    link: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ProjectRow> for PortfolioProject {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::new(row.id),
            title: row.title,
            description: row.description,
            link: row.link,
            image_url: row.image_url,
            created_at: row.created_at,
        }
    }
}

/// Repository for portfolio projects.
pub struct PortfolioRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PortfolioRepository<'a> {
    /// Create a new portfolio repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all projects, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self) -> Result<Vec<PortfolioProject>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r"
            SELECT id, title, description, link, image_url, created_at
            FROM portfolio
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a project by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProjectId) -> Result<Option<PortfolioProject>, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r"
            SELECT id, title, description, link, image_url, created_at
            FROM portfolio
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, draft: &ProjectDraft) -> Result<PortfolioProject, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r"
            INSERT INTO portfolio (title, description, link, image_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, link, image_url, created_at
            ",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.link)
        .bind(&draft.image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite a project's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the project does not exist.
    pub async fn update(
        &self,
        id: ProjectId,
        draft: &ProjectDraft,
    ) -> Result<PortfolioProject, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r"
            UPDATE portfolio
            SET title = $2, description = $3, link = $4, image_url = $5
            WHERE id = $1
            RETURNING id, title, description, link, image_url, created_at
            ",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.link)
        .bind(&draft.image_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete a project.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the project does not exist.
    pub async fn delete(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM portfolio WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
