//! CLI command handlers

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap_complete::generate;
use colored::Colorize;
use std::io;
use std::sync::Arc;
use tracing::debug;

use crate::media_keys;
use crate::panel::{PanelCommand, PanelMessage, PanelSession, QueueSnapshot, Timings, TrackInfo};
use crate::settings::Settings;
use crate::spotify::SpotifyClient;
use crate::token::{CredentialStatus, KeyringStorage, TokenStore};
use crate::ui;
use crate::ui::terminal::format_duration;

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub no_media_keys: bool,
}

impl GlobalOptions {
    fn settings(&self, refresh_interval: Option<u64>) -> Result<Settings> {
        Settings::load()?.with_overrides(self.client_id.clone(), self.redirect_uri.clone(), refresh_interval)
    }

    async fn session(&self, settings: &Settings) -> Result<PanelSession> {
        let client = SpotifyClient::new(open_tokens()?)?;
        let media_keys = if self.no_media_keys {
            debug!("Native media keys disabled");
            None
        } else {
            media_keys::detect().await
        };
        Ok(PanelSession::new(
            client,
            media_keys,
            Timings::with_poll_interval(settings.poll_interval()),
        ))
    }
}

fn open_tokens() -> Result<Arc<TokenStore>> {
    let storage = KeyringStorage::new()?;
    let tokens = TokenStore::open(Box::new(storage)).context("Failed to read stored Spotify credential")?;
    Ok(Arc::new(tokens))
}

/// Handle the `auth` command
pub async fn auth(opts: &GlobalOptions, code: Option<String>, no_browser: bool) -> Result<()> {
    let settings = opts.settings(None)?;
    let tokens = open_tokens()?;
    if tokens.status_at(Utc::now()) == CredentialStatus::Valid {
        println!("{}", "Already authenticated, starting a fresh authorization.".yellow());
    }
    println!("{}", "Authorizing with Spotify...".cyan());

    let credential = super::auth::authenticate(&settings, tokens, code, no_browser).await?;

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!(
        "  Token valid until {}",
        credential.expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!();
    println!("Credential stored securely in system keyring.");

    Ok(())
}

/// Handle the `panel` command
pub async fn panel(opts: &GlobalOptions, json: bool, interval: Option<u64>) -> Result<()> {
    let settings = opts.settings(interval)?;
    let session = opts.session(&settings).await?;

    if json {
        ui::run_stdio(session).await
    } else {
        ui::run_panel(session).await
    }
}

/// Handle the `status` command
pub async fn status(opts: &GlobalOptions, json: bool) -> Result<()> {
    let settings = opts.settings(None)?;
    let track = opts.session(&settings).await?.current_track().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&track)?);
    } else {
        print_track(&track);
    }
    Ok(())
}

/// Handle the `queue` command
pub async fn queue(opts: &GlobalOptions, json: bool) -> Result<()> {
    let settings = opts.settings(None)?;
    let queue = opts.session(&settings).await?.queue().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&queue)?);
    } else {
        print_queue(&queue);
    }
    Ok(())
}

/// Handle `play-pause`, `next`, `previous` and `skip`
pub async fn control(opts: &GlobalOptions, command: PanelCommand) -> Result<()> {
    let settings = opts.settings(None)?;
    let session = opts.session(&settings).await?;

    for message in session.handle(command).await {
        match message {
            PanelMessage::UpdateTrack(track) => print_track(&track),
            PanelMessage::UpdateQueue(queue) => {
                if let Some(next) = queue.queue.first() {
                    println!("  Up next: {} - {}", next.name, next.artist.dimmed());
                }
            }
            PanelMessage::Error { message } => anyhow::bail!(message),
        }
    }
    Ok(())
}

/// Handle the `logout` command
pub fn logout() -> Result<()> {
    open_tokens()?.clear()?;
    println!("{}", "Spotify credential removed.".green());
    Ok(())
}

/// Handle the `config` command
pub fn config(client_id: Option<String>, callback_url: Option<String>, refresh_interval: Option<u64>) -> Result<()> {
    let path = Settings::settings_path()?;
    let current = Settings::load_from(&path)?;

    if client_id.is_none() && callback_url.is_none() && refresh_interval.is_none() {
        println!("{} {}", "Settings:".green().bold(), path.display());
        let client_id = if current.client_id.is_empty() {
            "(not set)".yellow().to_string()
        } else {
            current.client_id.clone()
        };
        println!("  Client ID:        {}", client_id);
        println!("  Callback URL:     {}", current.callback_url);
        println!("  Refresh interval: {} ms", current.refresh_interval);
        return Ok(());
    }

    let updated = current.with_overrides(client_id, callback_url, refresh_interval)?;
    updated.save_to(&path)?;
    println!("{}", "Settings saved.".green());
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "spotify-widget", &mut io::stdout());
}

// Extension trait for Cli to get clap Command
impl super::Cli {
    fn command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}

fn print_track(track: &TrackInfo) {
    if track.error {
        println!("{}", track.artist.yellow().bold());
        println!("  {}", track.album.dimmed());
        return;
    }

    let state = if track.is_playing { "▶".green() } else { "⏸".cyan() };
    println!("{} {}", state, track.track.as_deref().unwrap_or_default().bold());
    println!("  {}", track.artist);
    println!("  {}", track.album.dimmed());
    println!(
        "  {} / {}",
        format_duration(track.progress_ms),
        format_duration(track.duration_ms)
    );
}

fn print_queue(queue: &QueueSnapshot) {
    if let Some(error) = &queue.error {
        println!("{}", error.yellow());
        return;
    }

    if let Some(current) = &queue.currently_playing {
        println!("{} {} - {}", "Now:".green().bold(), current.name, current.artist);
    }
    if queue.queue.is_empty() {
        println!("{}", "Queue is empty.".yellow());
        return;
    }
    println!("{}", "Up next:".green().bold());
    for (i, item) in queue.queue.iter().enumerate() {
        println!(
            "  {:>3}. {} - {} {}",
            i + 1,
            item.name,
            item.artist.dimmed(),
            format_duration(item.duration_ms).dimmed()
        );
    }
}
