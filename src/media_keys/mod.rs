//! Native media-key injection
//!
//! Sending the OS media key is faster than a Web API round trip, so simple
//! transport commands try it first. Availability is probed once at startup
//! and a missing backend is never an error.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use tracing::debug;

#[cfg(target_os = "linux")]
mod playerctl;
#[cfg(windows)]
mod send_input;

/// Transport controls that have a media-key equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    PlayPause,
    Next,
    Previous,
}

impl fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PlayPause => "PlayPause",
            Self::Next => "Next",
            Self::Previous => "Previous",
        })
    }
}

/// Host backend able to emit media keys
#[async_trait]
pub trait MediaKeys: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    async fn send(&self, command: TransportCommand) -> Result<()>;
}

/// Probe the host for a usable backend
pub async fn detect() -> Option<Box<dyn MediaKeys>> {
    #[cfg(target_os = "linux")]
    {
        match playerctl::Playerctl::probe().await {
            Ok(backend) => return Some(Box::new(backend)),
            Err(e) => debug!("playerctl not available, will use Web API fallback: {:#}", e),
        }
    }

    #[cfg(windows)]
    {
        return Some(Box::new(send_input::SendInputKeys));
    }

    #[allow(unreachable_code)]
    {
        debug!("No native media key backend for this platform");
        None
    }
}
