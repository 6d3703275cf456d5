//! CLI module for spotify-widget

use clap::{Parser, Subcommand};

pub mod auth;
pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "spotify-widget", about = "Spotify now-playing panel and playback remote")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Spotify application client id (overrides settings)
    #[arg(long, global = true, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Redirect URI registered with the Spotify application (overrides settings)
    #[arg(long, global = true, env = "SPOTIFY_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// Always use the Web API, never native media keys
    #[arg(long, global = true)]
    pub no_media_keys: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize with Spotify and store the access token
    Auth {
        /// Authorization code copied from the redirect page (prompted if omitted)
        #[arg(long)]
        code: Option<String>,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Open the now-playing panel
    Panel {
        /// Speak JSON lines on stdin/stdout instead of drawing a terminal UI
        #[arg(long)]
        json: bool,

        /// Poll interval in milliseconds (overrides settings)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show the current track once
    Status {
        /// Print the track snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the playback queue once
    Queue {
        /// Print the queue snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle play/pause
    PlayPause,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Previous,

    /// Skip forward several tracks in the queue
    Skip {
        /// Number of tracks to skip (1-50)
        #[arg(default_value = "1", allow_negative_numbers = true)]
        count: i64,
    },

    /// Remove the stored access token
    Logout,

    /// Show or change persistent settings
    Config {
        /// Set the Spotify application client id
        #[arg(long = "set-client-id", value_name = "ID")]
        client_id: Option<String>,

        /// Set the redirect URI
        #[arg(long = "set-callback-url", value_name = "URL")]
        callback_url: Option<String>,

        /// Set the poll interval in milliseconds
        #[arg(long = "set-refresh-interval", value_name = "MS")]
        refresh_interval: Option<u64>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_skip_defaults_to_one() {
        let cli = Cli::try_parse_from(["spotify-widget", "skip"]).unwrap();
        assert!(matches!(cli.command, Commands::Skip { count: 1 }));

        let cli = Cli::try_parse_from(["spotify-widget", "skip", "-3"]).unwrap();
        assert!(matches!(cli.command, Commands::Skip { count: -3 }));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["spotify-widget", "panel", "--json", "--no-media-keys", "-i", "500"]).unwrap();
        assert!(cli.no_media_keys);
        assert!(matches!(cli.command, Commands::Panel { json: true, interval: Some(500) }));
    }
}
