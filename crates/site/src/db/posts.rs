//! Blog post repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ritwrites_core::{NewPost, Post, PostId, ProfileId, Slug};

use super::{RepositoryError, map_unique_violation};

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    slug: String,
    content: String,
    author_id: Option<Uuid>,
    likes: i32,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            title: row.title,
            slug: Slug::from_stored(row.slug),
            content: row.content,
            author_id: row.author_id.map(ProfileId::new),
            likes: row.likes,
            created_at: row.created_at,
        }
    }
}

/// Repository for blog posts.
pub struct PostRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_recent(&self) -> Result<Vec<Post>, RepositoryError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r"
            SELECT id, title, slug, content, author_id, likes, created_at
            FROM posts
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a post by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, RepositoryError> {
        let row = sqlx::query_as::<_, PostRow>(
            r"
            SELECT id, title, slug, content, author_id, likes, created_at
            FROM posts
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another post already uses the slug.
    pub async fn create(&self, post: &NewPost) -> Result<Post, RepositoryError> {
        let row = sqlx::query_as::<_, PostRow>(
            r"
            INSERT INTO posts (title, slug, content, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, slug, content, author_id, likes, created_at
            ",
        )
        .bind(&post.title)
        .bind(post.slug.as_str())
        .bind(&post.content)
        .bind(post.author_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "a post with this title already exists"))?;

        Ok(row.into())
    }

    /// Delete a post and, by cascade, its comments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    pub async fn delete(&self, id: PostId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add one like and return the new count.
    ///
    /// The increment happens in the database so concurrent likes are never lost.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post does not exist.
    pub async fn like(&self, id: PostId) -> Result<i32, RepositoryError> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE posts SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
