//! Application profile extending an identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ProfileId;

/// The application's record for one identity.
///
/// Exactly one profile exists per identity. It is created lazily on the first
/// observed sign-in and never deleted by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same value as the identity id.
    pub id: ProfileId,
    /// Display name, if the user has set one.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Whether this profile may use the admin area.
    pub is_admin: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Name to show for this profile, falling back to a generic label.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("Reader")
    }
}

/// Insert payload for a profile created on first sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Identity id the profile belongs to.
    pub id: ProfileId,
    /// Admin flag decided by the first-admin bootstrap rule.
    pub is_admin: bool,
}
