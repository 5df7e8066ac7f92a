//! ritwrites CLI - database migrations and site management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! rw-cli migrate
//!
//! # Sign in with an access token and print the resolved session
//! rw-cli session --access-token "$TOKEN"
//!
//! # Show or update the site settings
//! rw-cli settings show
//! rw-cli settings set --access-token "$TOKEN" --name "Rit Writes"
//!
//! # Email a sign-in link
//! rw-cli auth magic-link --email reader@example.com
//!
//! # Manage administrators
//! rw-cli profiles list
//! rw-cli profiles promote 7d0c2f9e-5b7a-4c57-9a5e-0f8a6f1b2c3d
//! ```
//!
//! Set `RITWRITES_LOG_JSON=1` for JSON log lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ritwrites_core::{Email, ProfileId};

mod commands;

#[derive(Parser)]
#[command(name = "rw-cli")]
#[command(author, version, about = "ritwrites CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Resolve a session the way the site does on page load
    Session {
        /// Access token issued by the auth service
        #[arg(long, env = "RITWRITES_ACCESS_TOKEN")]
        access_token: Option<String>,

        /// Keep running and print every session change until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Show or update the site settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Auth service operations
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Manage profiles and administrators
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the settings row
    Show,
    /// Replace the settings row (administrators only)
    Set {
        /// Access token of an administrator
        #[arg(long, env = "RITWRITES_ACCESS_TOKEN")]
        access_token: String,

        /// Site title
        #[arg(short, long)]
        name: String,

        /// Tagline shown under the title
        #[arg(short, long)]
        description: Option<String>,

        /// Logo image URL
        #[arg(long)]
        logo_url: Option<String>,

        /// Hero image URL
        #[arg(long)]
        hero_image_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Email a passwordless sign-in link
    MagicLink {
        /// Recipient email address
        #[arg(short, long)]
        email: Email,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List all profiles
    List,
    /// Grant administrator access
    Promote {
        /// Profile (identity) id
        id: ProfileId,
    },
    /// Revoke administrator access
    Demote {
        /// Profile (identity) id
        id: ProfileId,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

/// Text logs by default, JSON when `RITWRITES_LOG_JSON` is set.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ritwrites=info,rw_cli=info".into());

    let json = std::env::var_os("RITWRITES_LOG_JSON").is_some();
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Session {
            access_token,
            watch,
        } => commands::session::show(access_token, watch).await?,
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show().await?,
            SettingsAction::Set {
                access_token,
                name,
                description,
                logo_url,
                hero_image_url,
            } => {
                let update = ritwrites_core::SiteSettingsUpdate {
                    site_name: name,
                    site_description: description,
                    logo_url,
                    hero_image_url,
                };
                commands::settings::set(access_token, update).await?;
            }
        },
        Commands::Auth { action } => match action {
            AuthAction::MagicLink { email } => commands::auth::magic_link(&email).await?,
        },
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list().await?,
            ProfilesAction::Promote { id } => commands::profiles::set_admin(id, true).await?,
            ProfilesAction::Demote { id } => commands::profiles::set_admin(id, false).await?,
        },
    }
    Ok(())
}
