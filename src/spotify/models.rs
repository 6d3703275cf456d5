//! Spotify Web API payloads
//!
//! Every field is optional: the service omits fields for podcasts, local
//! files and ads, and the panel must never fail because of it. Conversion
//! into the panel's strict records happens in `panel::normalize`.

use serde::Deserialize;

/// `GET /v1/me/player/currently-playing`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentlyPlaying {
    pub is_playing: Option<bool>,
    pub progress_ms: Option<u64>,
    pub item: Option<PlayableItem>,
}

/// `GET /v1/me/player/queue`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueResponse {
    pub currently_playing: Option<PlayableItem>,
    pub queue: Option<Vec<PlayableItem>>,
}

/// Track or episode as returned in playback payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayableItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub duration_ms: Option<u64>,
    pub artists: Option<Vec<ArtistRef>>,
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumRef {
    pub name: Option<String>,
    pub images: Option<Vec<Image>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub url: Option<String>,
}

/// Successful body of `POST /api/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub scope: Option<String>,
}

impl PlayableItem {
    /// Artist names joined the way the panel shows them
    pub fn artist_names(&self) -> Option<String> {
        let names: Vec<&str> = self
            .artists
            .as_deref()?
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }

    /// First (largest) album image
    pub fn album_art(&self) -> Option<&str> {
        self.album
            .as_ref()?
            .images
            .as_deref()?
            .first()?
            .url
            .as_deref()
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album.as_ref()?.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_without_album_parses() {
        let json = r#"{"is_playing":true,"progress_ms":10,"item":{"id":"e1","name":"Ep","duration_ms":99,"show":{}}}"#;
        let cp: CurrentlyPlaying = serde_json::from_str(json).unwrap();
        let item = cp.item.unwrap();
        assert_eq!(item.album_name(), None);
        assert_eq!(item.album_art(), None);
        assert_eq!(item.artist_names(), None);
    }

    #[test]
    fn test_artist_names_joined() {
        let json = r#"{"artists":[{"name":"A"},{"name":"B"}],"album":{"name":"X","images":[{"url":"big"},{"url":"small"}]}}"#;
        let item: PlayableItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.artist_names().as_deref(), Some("A, B"));
        assert_eq!(item.album_art(), Some("big"));
    }

    #[test]
    fn test_null_item() {
        let cp: CurrentlyPlaying = serde_json::from_str(r#"{"is_playing":false,"item":null}"#).unwrap();
        assert!(cp.item.is_none());
    }
}
