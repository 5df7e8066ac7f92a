//! Session inspection command.
//!
//! Runs the same session coordinator the site runs: resolves the profile for
//! the signed-in identity (creating it, and bootstrapping the first
//! administrator, on first sign-in) and loads the site settings.
//!
//! # Usage
//!
//! ```bash
//! # Print the session once
//! rw-cli session --access-token "$TOKEN"
//!
//! # Follow session changes until Ctrl-C
//! rw-cli session --access-token "$TOKEN" --watch
//! ```

use secrecy::SecretString;

use ritwrites_site::session::{SessionPhase, SessionState};

use super::{CommandError, connect_site, print_json};

/// Resolve and print the session for an optional access token.
pub async fn show(access_token: Option<String>, watch: bool) -> Result<(), CommandError> {
    let state = connect_site().await?;

    if let Some(token) = access_token {
        state
            .identity()
            .sign_in_with_token(SecretString::from(token))
            .await?;
    }

    if !watch {
        state.coordinator().initialize(state.identity()).await;
        let session = state.coordinator().snapshot();
        summarize(&session, &state.config().default_site_name);
        return print_json(&session);
    }

    let mut changes = state.coordinator().observe();
    let task = state.start_session();

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = changes.borrow_and_update().clone();
                summarize(&session, &state.config().default_site_name);
                print_json(&session)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
        }
    }

    task.shutdown().await;
    Ok(())
}

fn summarize(session: &SessionState, default_site_name: &str) {
    let site = session.site_name(default_site_name);
    match session.phase() {
        SessionPhase::Unauthenticated => tracing::info!(site, "Signed out"),
        SessionPhase::SyncingProfile => {
            tracing::warn!(site, "Signed in but no profile is available");
        }
        SessionPhase::Authenticated(profile) => tracing::info!(
            site,
            profile_id = %profile.id,
            name = profile.display_name(),
            is_admin = profile.is_admin,
            "Signed in"
        ),
    }
}
