//! Conversion from loosely typed Web API payloads into the panel model
//!
//! This is the only place that decides what a missing field turns into.

use super::model::{QueueItem, QueueSnapshot, TrackInfo};
use crate::spotify::models::{CurrentlyPlaying, PlayableItem, QueueResponse};
use crate::spotify::{ApiError, MissingCredential};

const UNKNOWN_TRACK: &str = "Unknown Track";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Now-playing payload to snapshot; nothing playing becomes a sentinel
pub fn track_info(payload: Option<CurrentlyPlaying>) -> TrackInfo {
    let Some(payload) = payload else {
        return nothing_playing();
    };
    let Some(item) = payload.item.as_ref() else {
        return nothing_playing();
    };

    TrackInfo {
        is_playing: payload.is_playing.unwrap_or(false),
        track: item.name.clone(),
        artist: item.artist_names().unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: item.album_name().unwrap_or(UNKNOWN_ALBUM).to_string(),
        album_art: item.album_art().unwrap_or_default().to_string(),
        progress_ms: payload.progress_ms.unwrap_or(0),
        duration_ms: item.duration_ms.unwrap_or(0),
        error: false,
    }
}

/// Read-path failure to sentinel
pub fn track_info_from_error(err: &ApiError) -> TrackInfo {
    match err {
        ApiError::Unauthenticated(MissingCredential::Expired) => {
            TrackInfo::status("Token expired", "Please re-authenticate with Spotify")
        }
        ApiError::Unauthenticated(MissingCredential::Missing) => {
            TrackInfo::status("Not authenticated", "Run \"spotify-widget auth\"")
        }
        ApiError::Http { status: 401, .. } => {
            TrackInfo::status("Authentication expired", "Please re-authenticate")
        }
        _ => TrackInfo::status("Connecting...", "Loading track info"),
    }
}

pub fn queue_item(item: &PlayableItem) -> QueueItem {
    QueueItem {
        id: item.id.clone().unwrap_or_default(),
        name: item.name.clone().unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
        artist: item.artist_names().unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: item.album_name().unwrap_or(UNKNOWN_ALBUM).to_string(),
        album_art: item.album_art().unwrap_or_default().to_string(),
        duration_ms: item.duration_ms.unwrap_or(0),
        uri: item.uri.clone().unwrap_or_default(),
    }
}

pub fn queue_snapshot(payload: Option<QueueResponse>) -> QueueSnapshot {
    let Some(payload) = payload else {
        return QueueSnapshot::unavailable("No queue available");
    };

    QueueSnapshot {
        currently_playing: payload.currently_playing.as_ref().map(queue_item),
        queue: payload
            .queue
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(queue_item)
            .collect(),
        error: None,
    }
}

pub fn queue_from_error(err: &ApiError) -> QueueSnapshot {
    match err {
        ApiError::Unauthenticated(MissingCredential::Missing) => QueueSnapshot::unavailable("Not authenticated"),
        ApiError::Unauthenticated(MissingCredential::Expired) => QueueSnapshot::unavailable("Token expired"),
        other => QueueSnapshot::unavailable(other.to_string()),
    }
}

fn nothing_playing() -> TrackInfo {
    TrackInfo::status("No track playing", "Start playing music on Spotify")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: serde::de::DeserializeOwned>(json: &str) -> T {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_null_item_is_no_track_playing() {
        let info = track_info(Some(parse(r#"{"is_playing":false,"item":null}"#)));
        assert!(info.error);
        assert_eq!(info.artist, "No track playing");
        assert!(info.track.is_none());
    }

    #[test]
    fn test_empty_response_is_no_track_playing() {
        let info = track_info(None);
        assert!(info.error);
        assert_eq!(info.artist, "No track playing");
    }

    #[test]
    fn test_full_track() {
        let info = track_info(Some(parse(
            r#"{"is_playing":true,"progress_ms":42000,"item":{"id":"t1","name":"Song",
                "duration_ms":180000,"artists":[{"name":"A"},{"name":"B"}],
                "album":{"name":"LP","images":[{"url":"https://i.scdn.co/image/x"}]}}}"#,
        )));
        assert_eq!(
            info,
            TrackInfo {
                is_playing: true,
                track: Some("Song".to_string()),
                artist: "A, B".to_string(),
                album: "LP".to_string(),
                album_art: "https://i.scdn.co/image/x".to_string(),
                progress_ms: 42000,
                duration_ms: 180000,
                error: false,
            }
        );
    }

    #[test]
    fn test_missing_art_and_duration_default() {
        let info = track_info(Some(parse(r#"{"item":{"name":"Song","album":{"name":"LP","images":[]}}}"#)));
        assert!(!info.error);
        assert!(!info.is_playing);
        assert_eq!(info.album_art, "");
        assert_eq!(info.duration_ms, 0);
        assert_eq!(info.progress_ms, 0);
    }

    #[test]
    fn test_error_sentinels() {
        let expired = track_info_from_error(&ApiError::Unauthenticated(MissingCredential::Expired));
        assert_eq!(expired.artist, "Token expired");
        let missing = track_info_from_error(&ApiError::Unauthenticated(MissingCredential::Missing));
        assert_eq!(missing.artist, "Not authenticated");
        let revoked = track_info_from_error(&ApiError::Http { status: 401, body: String::new() });
        assert_eq!(revoked.artist, "Authentication expired");
        let offline = track_info_from_error(&ApiError::Timeout);
        assert_eq!(offline.artist, "Connecting...");
        assert!(offline.error);
    }

    #[test]
    fn test_queue_items_degrade_to_defaults() {
        let snapshot = queue_snapshot(Some(parse(
            r#"{"currently_playing":{"id":"c","name":"Now","uri":"spotify:track:c"},
                "queue":[{}, {"name":"Next","artists":[],"duration_ms":1000,"uri":"spotify:track:n"}]}"#,
        )));

        assert_eq!(snapshot.currently_playing.as_ref().unwrap().name, "Now");
        assert_eq!(snapshot.queue.len(), 2);

        let blank = &snapshot.queue[0];
        assert_eq!(blank.id, "");
        assert_eq!(blank.name, "Unknown Track");
        assert_eq!(blank.artist, "Unknown Artist");
        assert_eq!(blank.album, "Unknown Album");
        assert_eq!(blank.album_art, "");
        assert_eq!(blank.duration_ms, 0);

        assert_eq!(snapshot.queue[1].artist, "Unknown Artist");
        assert_eq!(snapshot.uris(), vec!["".to_string(), "spotify:track:n".to_string()]);
    }

    #[test]
    fn test_missing_queue_payload() {
        let snapshot = queue_snapshot(None);
        assert_eq!(snapshot.error.as_deref(), Some("No queue available"));
        assert!(snapshot.queue.is_empty());
    }
}
