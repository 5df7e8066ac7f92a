//! Identity provider backed by the hosted Supabase Auth (`GoTrue`) API.
//!
//! Sign-in is passwordless: [`AuthClient::send_magic_link`] emails a link,
//! and the access token carried by that link is handed to
//! [`SupabaseIdentityProvider::sign_in_with_token`].

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use ritwrites_core::{Email, Identity, ProfileId};

use super::{IdentityChannel, IdentityProvider, IdentitySubscription};
use crate::config::SupabaseConfig;
use crate::store::StoreError;

/// Errors from the auth API.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport failure (DNS, TLS, timeout, malformed body).
    #[error("auth request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an unexpected status.
    #[error("auth API returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        message: String,
    },

    /// The access token was rejected or has expired.
    #[error("access token is invalid or expired")]
    InvalidToken,

    /// An endpoint URL could not be built from the configured base URL.
    #[error("invalid auth endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl From<AuthError> for StoreError {
    fn from(e: AuthError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

/// User record as returned by `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        // Phone and some OAuth users come back with an empty email string.
        let email = user.email.as_deref().and_then(|raw| Email::parse(raw).ok());
        Self::new(ProfileId::new(user.id), email)
    }
}

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

/// Thin client for the auth endpoints the site uses.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
}

impl AuthClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.base_url.join(path)?)
    }

    /// Resolve an access token to the identity it belongs to.
    ///
    /// Returns `Ok(None)` when the token is rejected (401/403), which callers
    /// treat as signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on transport failure or any other non-success status.
    pub async fn fetch_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, AuthError> {
        let response = self
            .http
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserResponse = response.json().await?;
                Ok(Some(user.into()))
            }
            status => Err(status_error(status, response).await),
        }
    }

    /// Email a one-time sign-in link, creating the auth user if needed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the request fails or is rejected.
    pub async fn send_magic_link(&self, email: &Email) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("auth/v1/otp")?)
            .header("apikey", self.anon_key.expose_secret())
            .json(&OtpRequest {
                email: email.as_str(),
                create_user: true,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(email_domain = %email.domain(), "Magic link requested");
            Ok(())
        } else {
            Err(status_error(status, response).await)
        }
    }

    /// Revoke the session behind an access token.
    ///
    /// A token that is already invalid counts as signed out.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` on transport failure or an unexpected status.
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("auth/v1/logout")?)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            status if status.is_success() => Ok(()),
            status => Err(status_error(status, response).await),
        }
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> AuthError {
    let message = response.text().await.unwrap_or_default();
    AuthError::Status {
        status: status.as_u16(),
        message,
    }
}

/// [`IdentityProvider`] for a single client session against Supabase Auth.
///
/// Holds the current access token and publishes every sign-in and sign-out
/// to its subscribers.
#[derive(Debug)]
pub struct SupabaseIdentityProvider {
    client: AuthClient,
    access_token: RwLock<Option<SecretString>>,
    channel: IdentityChannel,
}

impl SupabaseIdentityProvider {
    /// Create a provider with nobody signed in.
    #[must_use]
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            access_token: RwLock::new(None),
            channel: IdentityChannel::new(),
        }
    }

    /// Returns the underlying API client.
    #[must_use]
    pub const fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Validate an access token and make its identity the signed-in one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the API rejects the token, or
    /// another `AuthError` if it cannot be reached. Nothing is published on
    /// failure.
    pub async fn sign_in_with_token(&self, access_token: SecretString) -> Result<Identity, AuthError> {
        let identity = self
            .client
            .fetch_user(&access_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        *self.access_token.write().await = Some(access_token);
        tracing::info!(profile_id = %identity.id, "Signed in");
        self.channel.publish(Some(identity.clone()));
        Ok(identity)
    }

    /// Sign out locally and revoke the session remotely.
    ///
    /// The local sign-out always happens; a failed revoke is only logged.
    pub async fn sign_out(&self) {
        let token = self.access_token.write().await.take();

        if let Some(token) = token
            && let Err(e) = self.client.sign_out(&token).await
        {
            tracing::warn!(error = %e, "Remote sign-out failed, signing out locally");
        }

        tracing::info!("Signed out");
        self.channel.publish(None);
    }

    /// Forget a token the API no longer accepts and publish the sign-out.
    async fn expire(&self, token: &SecretString) {
        let mut current = self.access_token.write().await;
        // A newer sign-in may have replaced the token while it was checked.
        if !current
            .as_ref()
            .is_some_and(|t| t.expose_secret() == token.expose_secret())
        {
            return;
        }
        *current = None;
        drop(current);

        tracing::info!("Session expired, signing out");
        self.channel.publish(None);
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    async fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Ok(None);
        };

        let identity = self.client.fetch_user(&token).await?;
        if identity.is_none() {
            self.expire(&token).await;
        }
        Ok(identity)
    }

    fn subscribe(&self) -> IdentitySubscription {
        self.channel.subscribe()
    }
}
