//! MPRIS media keys through `playerctl`

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{MediaKeys, TransportCommand};

/// Player name the Spotify desktop client registers on D-Bus
const PLAYER: &str = "spotify";

pub struct Playerctl;

impl Playerctl {
    /// Succeeds only if the `playerctl` binary runs
    pub async fn probe() -> Result<Self> {
        let output = Command::new("playerctl")
            .arg("--version")
            .output()
            .await
            .context("Failed to run playerctl")?;

        if !output.status.success() {
            anyhow::bail!("playerctl --version exited with {}", output.status);
        }

        debug!(
            "playerctl {} available for media keys",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(Self)
    }
}

fn action(command: TransportCommand) -> &'static str {
    match command {
        TransportCommand::PlayPause => "play-pause",
        TransportCommand::Next => "next",
        TransportCommand::Previous => "previous",
    }
}

#[async_trait]
impl MediaKeys for Playerctl {
    fn name(&self) -> &'static str {
        "playerctl"
    }

    async fn send(&self, command: TransportCommand) -> Result<()> {
        let output = Command::new("playerctl")
            .args(["--player", PLAYER, action(command)])
            .output()
            .await
            .context("Failed to run playerctl")?;

        // No local Spotify player: exit status 1 and "No players found"
        if !output.status.success() {
            anyhow::bail!(
                "playerctl {} failed: {}",
                action(command),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions() {
        assert_eq!(action(TransportCommand::PlayPause), "play-pause");
        assert_eq!(action(TransportCommand::Next), "next");
        assert_eq!(action(TransportCommand::Previous), "previous");
    }
}
