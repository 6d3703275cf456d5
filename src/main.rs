//! spotify-widget - Spotify now-playing panel and playback remote

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod media_keys;
mod panel;
mod settings;
mod spotify;
mod token;
mod ui;
mod utils;

use cli::commands::GlobalOptions;
use cli::{Cli, Commands};
use panel::PanelCommand;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "spotify_widget=debug,reqwest=debug"
    } else {
        "spotify_widget=info"
    };

    // stdout carries panel frames in --json mode, so logs go to stderr
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(utils::PanelAwareLayer::new(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        ))
        .init();

    let opts = GlobalOptions {
        client_id: cli.client_id,
        redirect_uri: cli.redirect_uri,
        no_media_keys: cli.no_media_keys,
    };

    match cli.command {
        Commands::Auth { code, no_browser } => {
            cli::commands::auth(&opts, code, no_browser).await?;
        }
        Commands::Panel { json, interval } => {
            cli::commands::panel(&opts, json, interval).await?;
        }
        Commands::Status { json } => {
            cli::commands::status(&opts, json).await?;
        }
        Commands::Queue { json } => {
            cli::commands::queue(&opts, json).await?;
        }
        Commands::PlayPause => {
            cli::commands::control(&opts, PanelCommand::PlayPause).await?;
        }
        Commands::Next => {
            cli::commands::control(&opts, PanelCommand::Next).await?;
        }
        Commands::Previous => {
            cli::commands::control(&opts, PanelCommand::Previous).await?;
        }
        Commands::Skip { count } => {
            let command = PanelCommand::SkipTracks {
                count: Some(json!(count)),
            };
            cli::commands::control(&opts, command).await?;
        }
        Commands::Logout => {
            cli::commands::logout()?;
        }
        Commands::Config {
            client_id,
            callback_url,
            refresh_interval,
        } => {
            cli::commands::config(client_id, callback_url, refresh_interval)?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}
