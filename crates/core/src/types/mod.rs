//! Core types for ritwrites.
//!
//! This module provides type-safe wrappers for the blog's domain concepts.

pub mod content;
pub mod email;
pub mod id;
pub mod identity;
pub mod profile;
pub mod settings;
pub mod slug;

pub use content::{
    Comment, NewComment, NewPost, PortfolioProject, Post, ProjectDraft, ValidationError,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use identity::Identity;
pub use profile::{NewProfile, Profile};
pub use settings::{DEFAULT_SITE_NAME, SiteSettings, SiteSettingsUpdate};
pub use slug::{Slug, SlugError};
