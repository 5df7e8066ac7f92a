//! Blog posts, comments and portfolio projects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, ProfileId, ProjectId, Slug, SlugError};

/// Errors raised when user-submitted content fails validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was blank.
    #[error("{0} is required")]
    Required(&'static str),
    /// The title could not be turned into a slug.
    #[error("invalid title: {0}")]
    Slug(#[from] SlugError),
}

/// A published blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: Slug,
    /// Sanitized HTML produced by the editor.
    pub content: String,
    pub author_id: Option<ProfileId>,
    pub likes: i32,
    pub created_at: DateTime<Utc>,
}

/// A post ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub slug: Slug,
    pub content: String,
    pub author_id: ProfileId,
}

impl NewPost {
    /// Validate an editor submission and derive its slug from the title.
    ///
    /// An editor that was never typed into submits `<p></p>`, which counts as
    /// empty content.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the title or content is blank, or the
    /// title has nothing to build a slug from.
    pub fn from_editor(
        title: &str,
        content_html: &str,
        author_id: ProfileId,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::Required("title"));
        }

        let content = content_html.trim();
        if content.is_empty() || content == "<p></p>" {
            return Err(ValidationError::Required("content"));
        }

        Ok(Self {
            title: title.to_owned(),
            slug: Slug::from_title(title)?,
            content: content.to_owned(),
            author_id,
        })
    }
}

/// A reader comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: ProfileId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub user_id: ProfileId,
    pub content: String,
}

impl NewComment {
    /// Validate comment text. Surrounding whitespace is kept out of storage.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] if the text is blank.
    pub fn new(post_id: PostId, user_id: ProfileId, text: &str) -> Result<Self, ValidationError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ValidationError::Required("comment"));
        }
        Ok(Self {
            post_id,
            user_id,
            content: content.to_owned(),
        })
    }
}

/// A portfolio entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioProject {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a portfolio entry as edited in the admin area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProjectDraft {
    /// Trim the draft and check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] if the title or description is
    /// blank.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(ValidationError::Required("title"));
        }
        let description = self.description.trim().to_owned();
        if description.is_empty() {
            return Err(ValidationError::Required("description"));
        }

        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
        };

        Ok(Self {
            title,
            description,
            link: clean(self.link),
            image_url: clean(self.image_url),
        })
    }
}
