//! Auth service commands.
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Base URL of the hosted auth service
//! - `SUPABASE_ANON_KEY` - Public anon API key

use ritwrites_core::Email;
use ritwrites_site::config::SupabaseConfig;
use ritwrites_site::identity::AuthClient;

use super::CommandError;

/// Ask the auth service to email a sign-in link.
pub async fn magic_link(email: &Email) -> Result<(), CommandError> {
    let config = SupabaseConfig::from_env()?;
    let client = AuthClient::new(&config)?;

    client.send_magic_link(email).await?;

    tracing::info!(domain = email.domain(), "Magic link sent");
    Ok(())
}
