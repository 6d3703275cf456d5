//! Spotify Web API playback client

use chrono::Utc;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::error::{ApiError, MissingCredential};
use super::models::{CurrentlyPlaying, QueueResponse};
use crate::token::{CredentialStatus, TokenStore};

/// Production Web API host
pub const API_BASE: &str = "https://api.spotify.com";

/// Budget for every Web API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// HTTP client for the `/v1/me/player` endpoints
#[derive(Clone)]
pub struct SpotifyClient {
    api_base: String,
    tokens: Arc<TokenStore>,
    http_client: Client,
}

impl SpotifyClient {
    /// Create a client against the production API
    pub fn new(tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE, tokens)
    }

    /// Create a client against an arbitrary host
    pub fn with_base_url(api_base: &str, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        Self::build(api_base, tokens, REQUEST_TIMEOUT)
    }

    fn build(api_base: &str, tokens: Arc<TokenStore>, timeout: Duration) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .user_agent(concat!("spotify-widget/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
            http_client,
        })
    }

    /// Issue one authenticated request
    ///
    /// Returns `None` for 202/204 and for 2xx responses with an empty body.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ApiError> {
        let token = self.bearer_token()?;
        let url = format!("{}{}", self.api_base, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json");

        builder = match body {
            Some(body) => builder.body(body.to_string()),
            None if method != Method::GET => builder.header(CONTENT_LENGTH, 0),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT || status == StatusCode::ACCEPTED {
            return Ok(None);
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text).map(Some).map_err(|e| {
            debug!("Unparseable body from {}: {}", path, text);
            ApiError::Parse(e.to_string())
        })
    }

    /// Currently playing item, `None` when nothing is playing
    pub async fn fetch_current_track(&self) -> Result<Option<CurrentlyPlaying>, ApiError> {
        self.get_typed("/v1/me/player/currently-playing").await
    }

    /// Playback queue, `None` when the service has no active player
    pub async fn fetch_queue(&self) -> Result<Option<QueueResponse>, ApiError> {
        self.get_typed("/v1/me/player/queue").await
    }

    pub async fn next(&self) -> Result<(), ApiError> {
        self.request("/v1/me/player/next", Method::POST, None).await?;
        Ok(())
    }

    pub async fn previous(&self) -> Result<(), ApiError> {
        self.request("/v1/me/player/previous", Method::POST, None).await?;
        Ok(())
    }

    pub async fn set_pause(&self) -> Result<(), ApiError> {
        self.request("/v1/me/player/pause", Method::PUT, None).await?;
        Ok(())
    }

    pub async fn set_play(&self) -> Result<(), ApiError> {
        self.request("/v1/me/player/play", Method::PUT, None).await?;
        Ok(())
    }

    /// Replace the play list with `queue_uris` and start at `track_uri`
    pub async fn play_from_offset(&self, track_uri: &str, queue_uris: &[String]) -> Result<(), ApiError> {
        let body = json!({
            "uris": queue_uris,
            "offset": { "uri": track_uri },
        });
        self.request("/v1/me/player/play", Method::PUT, Some(&body)).await?;
        Ok(())
    }

    async fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        match self.request(path, Method::GET, None).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ApiError::Parse(e.to_string())),
            None => Ok(None),
        }
    }

    fn bearer_token(&self) -> Result<String, ApiError> {
        let now = Utc::now();
        match self.tokens.get() {
            Some(cred) if cred.is_valid_at(now) => Ok(cred.access_token),
            Some(cred) if cred.status_at(now) == CredentialStatus::Expired => {
                Err(ApiError::Unauthenticated(MissingCredential::Expired))
            }
            _ => Err(ApiError::Unauthenticated(MissingCredential::Missing)),
        }
    }
}
