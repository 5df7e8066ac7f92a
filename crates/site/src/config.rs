//! Site configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RITWRITES_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SUPABASE_URL` - Base URL of the hosted auth service (e.g., `https://xyz.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Public anon API key sent with every auth request
//!
//! ## Optional
//! - `RITWRITES_DEFAULT_SITE_NAME` - Title shown while no settings row exists (default: ritwrites)
//! - `RITWRITES_HTTP_TIMEOUT_SECS` - Auth request timeout in seconds (default: 10)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use ritwrites_core::DEFAULT_SITE_NAME;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MIN_API_KEY_LENGTH: usize = 32;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Site configuration.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Hosted auth service configuration
    pub supabase: SupabaseConfig,
    /// Title used when the settings row is absent
    pub default_site_name: String,
}

/// Hosted auth service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL
    pub url: Url,
    /// Anon API key
    pub anon_key: SecretString,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SiteConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_database_url("RITWRITES_DATABASE_URL")?,
            supabase: SupabaseConfig::from_env()?,
            default_site_name: get_env_or_default("RITWRITES_DEFAULT_SITE_NAME", DEFAULT_SITE_NAME),
        })
    }
}

impl SupabaseConfig {
    /// Load only the auth service settings.
    ///
    /// Used on its own by commands that never touch the database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let raw_url = get_required_env("SUPABASE_URL")?;
        let url = parse_base_url(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e))?;

        let anon_key = get_required_env("SUPABASE_ANON_KEY")?;
        validate_api_key(&anon_key, "SUPABASE_ANON_KEY")?;

        let timeout_secs = get_env_or_default(
            "RITWRITES_HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("RITWRITES_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            url,
            anon_key: SecretString::from(anon_key),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Returns the anon key for request headers.
    #[must_use]
    pub fn anon_key(&self) -> &str {
        self.anon_key.expose_secret()
    }
}

/// Load only the database URL.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither `RITWRITES_DATABASE_URL`
/// nor `DATABASE_URL` is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    get_database_url("RITWRITES_DATABASE_URL")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a project URL, requiring http(s) and dropping any trailing path.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that an API key is not a placeholder, is long enough and has
/// sufficient entropy.
fn validate_api_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = key.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    if key.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_API_KEY_LENGTH} characters (got {})",
                key.len()
            ),
        ));
    }

    let entropy = shannon_entropy(key);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
