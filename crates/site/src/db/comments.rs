//! Comment repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use ritwrites_core::{Comment, CommentId, NewComment, PostId, ProfileId};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    user_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::new(row.id),
            post_id: PostId::new(row.post_id),
            user_id: ProfileId::new(row.user_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// Repository for post comments.
pub struct CommentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CommentRepository<'a> {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List comments on a post in the order they were written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_post(&self, post_id: PostId) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, post_id, user_id, content, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(post_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert a comment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post or profile does not
    /// exist, `RepositoryError::Database` for other failures.
    pub async fn create(&self, comment: &NewComment) -> Result<Comment, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            INSERT INTO comments (post_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, user_id, content, created_at
            ",
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
