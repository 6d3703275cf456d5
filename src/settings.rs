//! User settings persistence
//!
//! Stored as JSON in ~/.config/spotify-widget/settings.json. A missing file
//! means defaults; command-line flags and environment variables override
//! individual values for a single run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Redirect page that displays the authorization code for copy-paste
pub const DEFAULT_CALLBACK_URL: &str = "https://anunayj.github.io/vscode-spotify-widget-auth/";

/// Default now-playing poll interval
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

/// Shortest poll interval accepted from the user
pub const MIN_REFRESH_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Spotify application client id, required for authentication
    pub client_id: String,
    /// Redirect URI registered with the Spotify application
    pub callback_url: String,
    /// Now-playing poll interval in milliseconds
    pub refresh_interval: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings: Self = serde_json::from_str(&contents).context("Failed to parse settings")?;
        settings.validate()?;

        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents).with_context(|| format!("Failed to write settings to {:?}", path))?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    pub fn settings_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("spotify-widget").join("settings.json"))
    }

    /// Check values that would otherwise fail later and less clearly
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.callback_url)
            .with_context(|| format!("Callback URL '{}' is not a valid URL", self.callback_url))?;

        if self.refresh_interval < MIN_REFRESH_INTERVAL_MS {
            anyhow::bail!(
                "Refresh interval must be at least {} ms (got {})",
                MIN_REFRESH_INTERVAL_MS,
                self.refresh_interval
            );
        }
        Ok(())
    }

    /// Apply per-run overrides from flags or environment
    pub fn with_overrides(
        mut self,
        client_id: Option<String>,
        callback_url: Option<String>,
        refresh_interval: Option<u64>,
    ) -> Result<Self> {
        if let Some(client_id) = client_id {
            self.client_id = client_id;
        }
        if let Some(callback_url) = callback_url {
            self.callback_url = callback_url;
        }
        if let Some(interval) = refresh_interval {
            self.refresh_interval = interval;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }
}
