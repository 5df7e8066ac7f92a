//! Business logic on top of the repositories and the session.

pub mod access;
pub mod content;
mod error;
pub mod settings;

pub use access::{AccessError, require_admin, require_signed_in};
pub use content::{ContentService, PostWithComments};
pub use error::ServiceError;
pub use settings::SettingsService;
