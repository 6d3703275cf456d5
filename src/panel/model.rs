//! Panel view model and wire messages
//!
//! Field names follow the JSON the panel front ends consume (camelCase).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Point-in-time now-playing snapshot, always replaces the previous one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub is_playing: bool,
    pub track: Option<String>,
    pub artist: String,
    pub album: String,
    pub album_art: String,
    #[serde(rename = "progress")]
    pub progress_ms: u64,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub error: bool,
}

impl TrackInfo {
    /// Error sentinel: `artist`/`album` carry a status line and a hint
    pub fn status(message: &str, hint: &str) -> Self {
        Self {
            is_playing: false,
            track: None,
            artist: message.to_string(),
            album: hint.to_string(),
            album_art: String::new(),
            progress_ms: 0,
            duration_ms: 0,
            error: true,
        }
    }
}

/// One entry of the playback queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub album_art: String,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub uri: String,
}

/// Current item plus upcoming items in service order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub currently_playing: Option<QueueItem>,
    pub queue: Vec<QueueItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueSnapshot {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            currently_playing: None,
            queue: Vec::new(),
            error: Some(message.into()),
        }
    }

    /// URIs of the upcoming items, for play-from-queue requests
    pub fn uris(&self) -> Vec<String> {
        self.queue.iter().map(|item| item.uri.clone()).collect()
    }
}

/// Command sent by a panel front end
///
/// `count` and `queueUris` stay loosely typed here so that bad values are
/// rejected by validation with a proper message rather than by the decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PanelCommand {
    PlayPause,
    Next,
    Previous,
    GetCurrentTrack,
    GetQueue,
    SkipToNext,
    SkipTracks {
        #[serde(default)]
        count: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    PlayFromQueue {
        #[serde(default)]
        track_uri: Option<Value>,
        #[serde(default)]
        queue_uris: Option<Value>,
    },
}

/// State pushed to a panel front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum PanelMessage {
    UpdateTrack(TrackInfo),
    UpdateQueue(QueueSnapshot),
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_commands_decode_from_panel_json() {
        let cmd: PanelCommand = serde_json::from_str(r#"{"command":"playPause"}"#).unwrap();
        assert_eq!(cmd, PanelCommand::PlayPause);

        let cmd: PanelCommand = serde_json::from_str(r#"{"command":"skipTracks","count":3}"#).unwrap();
        assert_eq!(cmd, PanelCommand::SkipTracks { count: Some(json!(3)) });

        let cmd: PanelCommand = serde_json::from_str(
            r#"{"command":"playFromQueue","trackUri":"spotify:track:b","queueUris":["spotify:track:a"]}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            PanelCommand::PlayFromQueue {
                track_uri: Some(json!("spotify:track:b")),
                queue_uris: Some(json!(["spotify:track:a"])),
            }
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(serde_json::from_str::<PanelCommand>(r#"{"command":"shuffle"}"#).is_err());
    }

    #[test]
    fn test_update_track_wire_shape() {
        let msg = PanelMessage::UpdateTrack(TrackInfo::status("No track playing", "Start playing music on Spotify"));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["command"], "updateTrack");
        assert_eq!(value["data"]["isPlaying"], false);
        assert_eq!(value["data"]["track"], Value::Null);
        assert_eq!(value["data"]["artist"], "No track playing");
        assert_eq!(value["data"]["albumArt"], "");
        assert_eq!(value["data"]["progress"], 0);
        assert_eq!(value["data"]["error"], true);
    }

    #[test]
    fn test_queue_snapshot_omits_absent_error() {
        let value = serde_json::to_value(PanelMessage::UpdateQueue(QueueSnapshot::default())).unwrap();
        assert_eq!(value["command"], "updateQueue");
        assert_eq!(value["data"]["currentlyPlaying"], Value::Null);
        assert!(value["data"].get("error").is_none());
    }
}
