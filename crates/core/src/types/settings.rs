//! Global site configuration (the singleton settings row).

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Title used when no settings row exists.
pub const DEFAULT_SITE_NAME: &str = "ritwrites";

/// The single global site-configuration record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Site title shown in the navigation bar.
    pub site_name: String,
    /// Tagline / meta description.
    #[serde(default)]
    pub site_description: Option<String>,
    /// Public URL of the logo image.
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Public URL of the home page hero image.
    #[serde(default)]
    pub hero_image_url: Option<String>,
}

/// Admin-submitted replacement for the settings row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettingsUpdate {
    pub site_name: String,
    #[serde(default)]
    pub site_description: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub hero_image_url: Option<String>,
}

impl SiteSettingsUpdate {
    /// Validate and normalize the update into the row that will be stored.
    ///
    /// Blank optional fields are stored as `NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] if `site_name` is blank.
    pub fn validate(self) -> Result<SiteSettings, ValidationError> {
        let site_name = self.site_name.trim();
        if site_name.is_empty() {
            return Err(ValidationError::Required("site_name"));
        }

        Ok(SiteSettings {
            site_name: site_name.to_owned(),
            site_description: non_blank(self.site_description),
            logo_url: non_blank(self.logo_url),
            hero_image_url: non_blank(self.hero_image_url),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
