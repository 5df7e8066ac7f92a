//! Blog and portfolio content operations.
//!
//! Reads are public. Commenting needs a signed-in identity; writing posts
//! and projects needs an administrator.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use ritwrites_core::{
    Comment, NewComment, NewPost, PortfolioProject, Post, PostId, ProjectDraft, ProjectId,
};

use super::ServiceError;
use super::access::{require_admin, require_signed_in};
use crate::db::{CommentRepository, PortfolioRepository, PostRepository};
use crate::session::SessionState;

/// A post together with its comments, oldest comment first.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithComments {
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Content service over the site database.
pub struct ContentService<'a> {
    posts: PostRepository<'a>,
    comments: CommentRepository<'a>,
    portfolio: PortfolioRepository<'a>,
}

impl<'a> ContentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            posts: PostRepository::new(pool),
            comments: CommentRepository::new(pool),
            portfolio: PortfolioRepository::new(pool),
        }
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// All posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_posts(&self) -> Result<Vec<Post>, ServiceError> {
        self.posts
            .list_recent()
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))
    }

    /// A post by slug, with its comments.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no post has this slug.
    pub async fn post_with_comments(&self, slug: &str) -> Result<PostWithComments, ServiceError> {
        let post = self
            .posts
            .get_by_slug(slug)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))?
            .ok_or(ServiceError::NotFound("post"))?;

        let comments = self
            .comments
            .list_for_post(post.id)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))?;

        Ok(PostWithComments { post, comments })
    }

    /// Like a post and return its new like count.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the post does not exist.
    pub async fn like_post(&self, id: PostId) -> Result<i32, ServiceError> {
        self.posts
            .like(id)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))
    }

    /// Comment on a post as the signed-in identity.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` when signed out, `ServiceError::Validation`
    /// for blank text, and `ServiceError::NotFound` if the post is gone.
    #[instrument(skip_all, fields(post_id = %post_id))]
    pub async fn add_comment(
        &self,
        session: &SessionState,
        post_id: PostId,
        text: &str,
    ) -> Result<Comment, ServiceError> {
        let identity = require_signed_in(session)?;
        let comment = NewComment::new(post_id, identity.id, text)?;

        self.comments
            .create(&comment)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))
    }

    /// Publish a post written in the editor.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` unless the session is an administrator,
    /// `ServiceError::Validation` for a blank title or content, and
    /// `ServiceError::Repository` if the slug is already taken.
    #[instrument(skip(self, session, content_html))]
    pub async fn create_post(
        &self,
        session: &SessionState,
        title: &str,
        content_html: &str,
    ) -> Result<Post, ServiceError> {
        let admin = require_admin(session)?;
        let post = NewPost::from_editor(title, content_html, admin.id)?;

        let created = self
            .posts
            .create(&post)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))?;

        info!(post_id = %created.id, slug = %created.slug, "Post published");
        Ok(created)
    }

    /// Delete a post and its comments.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` unless the session is an administrator,
    /// and `ServiceError::NotFound` if the post does not exist.
    pub async fn delete_post(&self, session: &SessionState, id: PostId) -> Result<(), ServiceError> {
        require_admin(session)?;
        self.posts
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_repository(e, "post"))?;

        info!(post_id = %id, "Post deleted");
        Ok(())
    }

    // =========================================================================
    // Portfolio
    // =========================================================================

    /// All projects, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    pub async fn list_projects(&self) -> Result<Vec<PortfolioProject>, ServiceError> {
        self.portfolio
            .list_recent()
            .await
            .map_err(|e| ServiceError::from_repository(e, "project"))
    }

    /// A single project.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the project does not exist.
    pub async fn get_project(&self, id: ProjectId) -> Result<PortfolioProject, ServiceError> {
        self.portfolio
            .get(id)
            .await
            .map_err(|e| ServiceError::from_repository(e, "project"))?
            .ok_or(ServiceError::NotFound("project"))
    }

    /// Create a project, or update it when `id` is given.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` unless the session is an administrator,
    /// `ServiceError::Validation` if the title or description is blank, and
    /// `ServiceError::NotFound` when updating a project that does not exist.
    #[instrument(skip(self, session, draft))]
    pub async fn save_project(
        &self,
        session: &SessionState,
        id: Option<ProjectId>,
        draft: ProjectDraft,
    ) -> Result<PortfolioProject, ServiceError> {
        require_admin(session)?;
        let draft = draft.validate()?;

        let saved = match id {
            Some(id) => self.portfolio.update(id, &draft).await,
            None => self.portfolio.create(&draft).await,
        }
        .map_err(|e| ServiceError::from_repository(e, "project"))?;

        info!(project_id = %saved.id, "Project saved");
        Ok(saved)
    }

    /// Delete a project.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Access` unless the session is an administrator,
    /// and `ServiceError::NotFound` if the project does not exist.
    pub async fn delete_project(
        &self,
        session: &SessionState,
        id: ProjectId,
    ) -> Result<(), ServiceError> {
        require_admin(session)?;
        self.portfolio
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_repository(e, "project"))?;

        info!(project_id = %id, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;

    use ritwrites_core::{Identity, Profile, ProfileId, ValidationError};

    use super::*;
    use crate::services::AccessError;

    // Access and validation are checked before any query, so the pool never connects.
    fn unused_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://ritwrites@localhost/ritwrites_unused")
            .unwrap()
    }

    fn session(is_admin: bool) -> SessionState {
        let id = ProfileId::random();
        SessionState {
            identity: Some(Identity::new(id, None)),
            profile: Some(Profile {
                id,
                full_name: None,
                is_admin,
                created_at: Utc::now(),
            }),
            settings: None,
        }
    }

    #[tokio::test]
    async fn test_signed_out_cannot_comment() {
        let pool = unused_pool();
        let err = ContentService::new(&pool)
            .add_comment(&SessionState::default(), PostId::new(1), "Lovely post")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Access(AccessError::SignedOut)));
    }

    #[tokio::test]
    async fn test_blank_comment_is_rejected() {
        let pool = unused_pool();
        let err = ContentService::new(&pool)
            .add_comment(&session(false), PostId::new(1), "   ")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reader_cannot_publish() {
        let pool = unused_pool();
        let err = ContentService::new(&pool)
            .create_post(&session(false), "Hello", "<p>Hi</p>")
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Access(AccessError::NotAdmin)));
    }

    #[tokio::test]
    async fn test_untouched_editor_is_empty_content() {
        let pool = unused_pool();
        let err = ContentService::new(&pool)
            .create_post(&session(true), "Hello", "<p></p>")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Required("content"))
        ));
    }

    #[tokio::test]
    async fn test_project_needs_description() {
        let pool = unused_pool();
        let draft = ProjectDraft {
            title: "Portfolio site".to_owned(),
            description: String::new(),
            link: None,
            image_url: None,
        };
        let err = ContentService::new(&pool)
            .save_project(&session(true), None, draft)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::Required("description"))
        ));
    }

    #[tokio::test]
    async fn test_reader_cannot_delete_project() {
        let pool = unused_pool();
        let err = ContentService::new(&pool)
            .delete_project(&session(false), ProjectId::new(3))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Access(AccessError::NotAdmin)));
    }
}
