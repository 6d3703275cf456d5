//! Playback sync loop and command relay
//!
//! A `PanelSession` owns everything a panel needs: the Web API client (and
//! through it the token store), the optional media-key backend and the
//! timings. Read paths never fail; they degrade into sentinel snapshots.
//! Write paths report their failure to the panel as an `Error` message.

use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::model::{PanelCommand, PanelMessage, QueueSnapshot, TrackInfo};
use super::normalize;
use crate::media_keys::{MediaKeys, TransportCommand};
use crate::spotify::{ApiError, CommandError, SpotifyClient, ValidationError};

/// Upper bound for a single multi-skip request
pub const MAX_SKIP_COUNT: i64 = 50;

/// Largest integer a JSON front end can represent exactly
const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Timing knobs of the loop
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Interval between now-playing polls
    pub poll_interval: Duration,
    /// Pause between consecutive skips of a multi-skip
    pub skip_delay: Duration,
    /// Wait after a play-from-queue before reading state back
    pub settle_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            skip_delay: Duration::from_millis(300),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl Timings {
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }
}

/// Which path carried a transport command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPath {
    MediaKey,
    WebApi,
}

pub struct PanelSession {
    client: SpotifyClient,
    media_keys: Option<Box<dyn MediaKeys>>,
    timings: Timings,
    last_track_id: Mutex<Option<String>>,
}

impl PanelSession {
    pub fn new(client: SpotifyClient, media_keys: Option<Box<dyn MediaKeys>>, timings: Timings) -> Self {
        Self {
            client,
            media_keys,
            timings,
            last_track_id: Mutex::new(None),
        }
    }

    /// Now-playing snapshot; failures become sentinels
    pub async fn current_track(&self) -> TrackInfo {
        match self.client.fetch_current_track().await {
            Ok(payload) => {
                let id = payload
                    .as_ref()
                    .and_then(|p| p.item.as_ref())
                    .and_then(|item| item.id.clone());
                self.note_track(id);
                normalize::track_info(payload)
            }
            Err(e) => {
                debug!("Now-playing fetch failed: {}", e);
                normalize::track_info_from_error(&e)
            }
        }
    }

    /// Queue snapshot; failures become an empty queue with an error string
    pub async fn queue(&self) -> QueueSnapshot {
        match self.client.fetch_queue().await {
            Ok(payload) => normalize::queue_snapshot(payload),
            Err(e) => {
                debug!("Queue fetch failed: {}", e);
                normalize::queue_from_error(&e)
            }
        }
    }

    pub async fn skip_to_next(&self) -> Result<(), CommandError> {
        self.client.next().await?;
        Ok(())
    }

    /// Skip `count` tracks, one request at a time
    ///
    /// The delay separates consecutive requests and is not applied after the
    /// last one. Nothing is sent if `count` is out of range.
    pub async fn skip_tracks(&self, count: i64) -> Result<(), CommandError> {
        validate_skip_count(count)?;

        for i in 0..count {
            self.client.next().await?;
            if i < count - 1 {
                tokio::time::sleep(self.timings.skip_delay).await;
            }
        }
        debug!("Skipped {} tracks", count);
        Ok(())
    }

    /// Start playback of `queue_uris` at `track_uri`, then wait for the
    /// service to settle before state is read back
    pub async fn play_from_queue(&self, track_uri: &str, queue_uris: &[String]) -> Result<(), CommandError> {
        if track_uri.is_empty() {
            return Err(ValidationError::MissingTrackUri.into());
        }
        self.client.play_from_offset(track_uri, queue_uris).await?;
        tokio::time::sleep(self.timings.settle_delay).await;
        Ok(())
    }

    /// Send a transport command, media key first, Web API second
    pub async fn send_transport(&self, command: TransportCommand) -> Result<TransportPath, CommandError> {
        if let Some(keys) = &self.media_keys {
            match keys.send(command).await {
                Ok(()) => {
                    info!("Sent {} via {} media key", command, keys.name());
                    return Ok(TransportPath::MediaKey);
                }
                Err(e) => warn!("{} failed: {:#}, falling back to Web API", keys.name(), e),
            }
        }

        match command {
            TransportCommand::PlayPause => self.toggle_playback().await?,
            TransportCommand::Next => self.client.next().await?,
            TransportCommand::Previous => self.client.previous().await?,
        }
        info!("Sent {} via Spotify Web API", command);
        Ok(TransportPath::WebApi)
    }

    /// The API has no toggle: read the play state, then pause or play.
    /// If the read fails, try pause and then play as a last resort.
    async fn toggle_playback(&self) -> Result<(), ApiError> {
        match self.client.fetch_current_track().await {
            Ok(state) => {
                if state.and_then(|s| s.is_playing).unwrap_or(false) {
                    self.client.set_pause().await
                } else {
                    self.client.set_play().await
                }
            }
            Err(e) => {
                info!("Could not determine playback state: {}, attempting pause", e);
                match self.client.set_pause().await {
                    Ok(()) => Ok(()),
                    Err(_) => self.client.set_play().await,
                }
            }
        }
    }

    /// Handle one panel command and return the messages to push, in order
    pub async fn handle(&self, command: PanelCommand) -> Vec<PanelMessage> {
        match command {
            PanelCommand::PlayPause => self.handle_transport(TransportCommand::PlayPause).await,
            PanelCommand::Next => self.handle_transport(TransportCommand::Next).await,
            PanelCommand::Previous => self.handle_transport(TransportCommand::Previous).await,
            PanelCommand::GetCurrentTrack => vec![PanelMessage::UpdateTrack(self.current_track().await)],
            PanelCommand::GetQueue => vec![PanelMessage::UpdateQueue(self.queue().await)],
            PanelCommand::SkipToNext => {
                let result = self.skip_to_next().await;
                self.after_write(result, "Failed to skip track").await
            }
            PanelCommand::SkipTracks { count } => {
                let result = match parse_skip_count(count.as_ref()) {
                    Ok(count) => self.skip_tracks(count).await,
                    Err(e) => Err(e.into()),
                };
                self.after_write(result, "Failed to skip tracks").await
            }
            PanelCommand::PlayFromQueue { track_uri, queue_uris } => {
                let result = match parse_play_from_queue(track_uri.as_ref(), queue_uris.as_ref()) {
                    Ok((track_uri, queue_uris)) => self.play_from_queue(&track_uri, &queue_uris).await,
                    Err(e) => Err(e.into()),
                };
                self.after_write(result, "Failed to play track from queue").await
            }
        }
    }

    async fn handle_transport(&self, command: TransportCommand) -> Vec<PanelMessage> {
        match self.send_transport(command).await {
            Ok(_) => vec![PanelMessage::UpdateTrack(self.current_track().await)],
            Err(CommandError::Api(ApiError::Unauthenticated(_))) => vec![PanelMessage::Error {
                message: "Not authenticated with Spotify. Please run \"spotify-widget auth\".".to_string(),
            }],
            Err(e) => {
                warn!("Spotify command failed: {}", e);
                vec![PanelMessage::Error {
                    message: "Failed to control Spotify. Make sure Spotify is running and you are authenticated."
                        .to_string(),
                }]
            }
        }
    }

    /// Successful writes push fresh track and queue state; failures push an error
    async fn after_write(&self, result: Result<(), CommandError>, failure: &str) -> Vec<PanelMessage> {
        match result {
            Ok(()) => {
                let track = self.current_track().await;
                let queue = self.queue().await;
                vec![PanelMessage::UpdateTrack(track), PanelMessage::UpdateQueue(queue)]
            }
            Err(e) => {
                warn!("{}: {}", failure, e);
                vec![PanelMessage::Error {
                    message: format!("{}: {}", failure, e),
                }]
            }
        }
    }

    fn note_track(&self, id: Option<String>) {
        let mut last = self.last_track_id.lock().unwrap_or_else(|e| e.into_inner());
        if *last != id {
            debug!("Track changed: {:?} -> {:?}", *last, id);
            *last = id;
        }
    }

    /// Drive the panel until it goes away
    ///
    /// Polls now-playing on every tick and runs each command in its own task,
    /// so neither a slow poll nor a long multi-skip holds up the other. A tick
    /// is skipped while the previous poll is still in flight. Dropping the
    /// command sender (or the message receiver) disposes the panel and stops
    /// the timer; requests already in flight are left to finish.
    pub async fn run(self, mut commands: mpsc::Receiver<PanelCommand>, messages: mpsc::Sender<PanelMessage>) {
        let session = Arc::new(self);
        let mut ticker = tokio::time::interval(session.timings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                biased;

                _ = messages.closed() => break,
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    debug!("Panel command: {:?}", command);
                    let session = Arc::clone(&session);
                    let messages = messages.clone();
                    tokio::spawn(async move {
                        for message in session.handle(command).await {
                            if messages.send(message).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                _ = ticker.tick() => {
                    if poll.as_ref().is_some_and(|handle| !handle.is_finished()) {
                        debug!("Previous poll still in flight, skipping tick");
                        continue;
                    }
                    let session = Arc::clone(&session);
                    let messages = messages.clone();
                    poll = Some(tokio::spawn(async move {
                        let track = session.current_track().await;
                        let _ = messages.send(PanelMessage::UpdateTrack(track)).await;
                    }));
                }
            }
        }

        debug!("Panel disposed, poll timer stopped");
    }
}

/// Range check for multi-skip counts
pub fn validate_skip_count(count: i64) -> Result<(), ValidationError> {
    if count <= 0 || count > MAX_SAFE_INTEGER {
        return Err(ValidationError::SkipCountNotPositive);
    }
    if count > MAX_SKIP_COUNT {
        return Err(ValidationError::SkipCountTooLarge {
            max: MAX_SKIP_COUNT as u32,
        });
    }
    Ok(())
}

/// Skip count from panel JSON; absent means one
///
/// Integral floats such as `3.0` count as integers, as they do in JavaScript.
pub fn parse_skip_count(raw: Option<&Value>) -> Result<i64, ValidationError> {
    let value = match raw {
        None | Some(Value::Null) => return Ok(1),
        Some(value) => value,
    };
    if let Some(count) = value.as_i64() {
        return Ok(count);
    }
    match value.as_f64() {
        Some(count) if count.fract() == 0.0 && count.abs() <= MAX_SAFE_INTEGER as f64 => Ok(count as i64),
        _ => Err(ValidationError::SkipCountNotPositive),
    }
}

/// Track URI and queue URIs from panel JSON
pub fn parse_play_from_queue(
    track_uri: Option<&Value>,
    queue_uris: Option<&Value>,
) -> Result<(String, Vec<String>), ValidationError> {
    let track_uri = track_uri
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingTrackUri)?;

    let queue_uris = queue_uris
        .and_then(Value::as_array)
        .ok_or(ValidationError::QueueUrisNotSequence)?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(ValidationError::QueueUrisNotSequence)?;

    Ok((track_uri.to_string(), queue_uris))
}
