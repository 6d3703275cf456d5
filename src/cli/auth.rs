//! Interactive Spotify authorization
//!
//! Spotify redirects to a static page that shows the authorization code, so
//! there is no local callback server: the user copies the code and pastes it
//! back here.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::settings::Settings;
use crate::spotify::{AuthError, AuthFlow, AuthState};
use crate::token::{Credential, TokenStore};

/// Pause before prompting so the browser can take focus first
const PROMPT_DELAY: Duration = Duration::from_secs(2);

/// Run the full authorize → paste → exchange flow
pub async fn authenticate(
    settings: &Settings,
    tokens: Arc<TokenStore>,
    code: Option<String>,
    no_browser: bool,
) -> Result<Credential> {
    let mut flow = AuthFlow::new(&settings.client_id, &settings.callback_url, tokens)?;

    let url = match flow.begin() {
        Ok(url) => url,
        Err(AuthError::MissingClientId) => {
            print_client_id_help(&settings.callback_url);
            if code.is_some() {
                anyhow::bail!(AuthError::MissingClientId);
            }
            let client_id = prompt_for_client_id()?;
            flow.set_client_id(&client_id);
            flow.begin()?
        }
        Err(e) => return Err(e.into()),
    };

    if no_browser {
        println!("Open this URL to authorize:");
        println!("  {}", url.cyan());
    } else {
        println!("Opening Spotify authorization in your browser...");
        if let Err(e) = open::that(&url) {
            warn!("Failed to open browser: {}", e);
            println!("Could not open a browser. Open this URL instead:");
        }
        println!("  {}", url.cyan());
    }
    println!();

    let code = match code {
        Some(code) => code,
        None => {
            tokio::time::sleep(PROMPT_DELAY).await;
            prompt_for_code()?
        }
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Exchanging authorization code...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = flow.exchange(&code).await;
    spinner.finish_and_clear();

    match result {
        Ok(credential) => {
            info!("Spotify authorization complete");
            Ok(credential)
        }
        Err(e) => {
            debug!("Auth flow ended in {:?}", flow.state());
            match flow.state() {
                AuthState::Failed(detail) => anyhow::bail!("Authentication failed: {}", detail),
                _ => Err(e).context("Authentication failed"),
            }
        }
    }
}

/// Ask for a client id and remember it for next time
fn prompt_for_client_id() -> Result<String> {
    let client_id: String = Input::new()
        .with_prompt("Spotify client ID")
        .interact_text()
        .context("Failed to read client ID")?;
    let client_id = client_id.trim().to_string();

    let mut stored = Settings::load()?;
    stored.client_id = client_id.clone();
    stored.save()?;
    info!("Client ID saved to settings");

    Ok(client_id)
}

fn prompt_for_code() -> Result<String> {
    let code: String = Input::new()
        .with_prompt("Paste the authorization code from the Spotify redirect page")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("The code cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read authorization code")?;
    Ok(code)
}

fn print_client_id_help(callback_url: &str) {
    println!("{}", "No Spotify client ID configured.".yellow().bold());
    println!();
    println!("Create an app at {}", "https://developer.spotify.com/dashboard".cyan());
    println!("and add this redirect URI to it:");
    println!("  {}", callback_url);
    println!();
    println!("Enter its client ID below, or set it later with");
    println!("  {}", "spotify-widget config --set-client-id <ID>".cyan());
    println!("or {} for a single run.", "SPOTIFY_CLIENT_ID".cyan());
    println!();
}
