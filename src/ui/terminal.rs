//! Terminal now-playing panel

use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Direction, Layout},
    prelude::*,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
};
use serde_json::json;
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::debug;

use crate::panel::{PanelCommand, PanelMessage, PanelSession, QueueSnapshot, TrackInfo};
use crate::utils::PanelActiveGuard;

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

/// What a key press asks for
#[derive(Debug, Clone, PartialEq)]
enum KeyAction {
    Send(PanelCommand),
    Quit,
}

struct PanelState {
    track: TrackInfo,
    queue: QueueSnapshot,
    list_state: ListState,
    status_message: String,
    /// When the status message was set (for auto-clear timeout)
    status_message_time: Option<Instant>,
}

impl PanelState {
    fn new() -> Self {
        Self {
            track: TrackInfo::status("Connecting...", "Loading track info"),
            queue: QueueSnapshot::default(),
            list_state: ListState::default(),
            status_message: String::new(),
            status_message_time: None,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.status_message_time = Some(Instant::now());
    }

    fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time
            && time.elapsed() > STATUS_TIMEOUT
        {
            self.status_message.clear();
            self.status_message_time = None;
        }
    }

    /// Apply a pushed message; returns true when a different track started
    fn apply(&mut self, message: PanelMessage) -> bool {
        match message {
            PanelMessage::UpdateTrack(track) => {
                let changed = !track.error
                    && (track.track != self.track.track || track.artist != self.track.artist);
                self.track = track;
                changed
            }
            PanelMessage::UpdateQueue(queue) => {
                self.queue = queue;
                let len = self.queue.queue.len();
                match self.list_state.selected() {
                    _ if len == 0 => self.list_state.select(None),
                    Some(i) if i >= len => self.list_state.select(Some(len - 1)),
                    None => self.list_state.select(Some(0)),
                    Some(_) => {}
                }
                false
            }
            PanelMessage::Error { message } => {
                self.set_status(message);
                false
            }
        }
    }

    fn move_up(&mut self) {
        let len = self.queue.queue.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn move_down(&mut self) {
        let len = self.queue.queue.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn handle_key(&mut self, code: KeyCode) -> Option<KeyAction> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
            KeyCode::Char(' ') => Some(KeyAction::Send(PanelCommand::PlayPause)),
            KeyCode::Char('n') => Some(KeyAction::Send(PanelCommand::Next)),
            KeyCode::Char('p') => Some(KeyAction::Send(PanelCommand::Previous)),
            KeyCode::Char('s') => {
                self.set_status("Skipping...");
                Some(KeyAction::Send(PanelCommand::SkipToNext))
            }
            KeyCode::Char('r') => {
                self.set_status("Refreshing queue...");
                Some(KeyAction::Send(PanelCommand::GetQueue))
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_up();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_down();
                None
            }
            KeyCode::Enter => {
                let index = self.list_state.selected()?;
                if index >= self.queue.queue.len() {
                    return None;
                }
                let count = index + 1;
                self.set_status(format!("Skipping {} track{}...", count, if count == 1 { "" } else { "s" }));
                Some(KeyAction::Send(PanelCommand::SkipTracks {
                    count: Some(json!(count)),
                }))
            }
            KeyCode::Char('P') => {
                let item = self.queue.queue.get(self.list_state.selected()?)?.clone();
                let queue_uris = self.queue.uris();
                self.set_status(format!("Playing {}...", item.name));
                Some(KeyAction::Send(PanelCommand::PlayFromQueue {
                    track_uri: Some(json!(item.uri)),
                    queue_uris: Some(json!(queue_uris)),
                }))
            }
            _ => None,
        }
    }
}

/// Run the interactive panel until the user quits
pub async fn run_panel(session: PanelSession) -> Result<()> {
    // Keep log lines off the alternate screen
    let _log_guard = PanelActiveGuard::activate();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (command_tx, command_rx) = mpsc::channel(32);
    let (message_tx, mut message_rx) = mpsc::channel(32);
    tokio::spawn(session.run(command_rx, message_tx));

    let mut state = PanelState::new();
    let result = match command_tx.send(PanelCommand::GetQueue).await {
        Ok(()) => run_panel_loop(&mut terminal, &mut state, &command_tx, &mut message_rx).await,
        Err(e) => Err(e.into()),
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    // Closing the command channel disposes the sync loop
    drop(command_tx);
    result
}

async fn run_panel_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut PanelState,
    commands: &mpsc::Sender<PanelCommand>,
    messages: &mut mpsc::Receiver<PanelMessage>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        state.check_status_timeout();
        terminal.draw(|f| draw_ui(f, state))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match state.handle_key(key.code) {
                        Some(KeyAction::Quit) => return Ok(()),
                        Some(KeyAction::Send(command)) => commands.send(command).await?,
                        None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
            message = messages.recv() => {
                let Some(message) = message else { return Ok(()) };
                if state.apply(message) {
                    debug!("Track changed, refreshing queue");
                    commands.send(PanelCommand::GetQueue).await?;
                }
            }
            _ = redraw.tick() => {}
        }
    }
}

pub(crate) fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn draw_ui(f: &mut Frame, state: &PanelState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(f.area());

    let (symbol, header_style) = if state.track.is_playing {
        ("▶ Playing", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("⏸ Paused", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    };
    let header = Paragraph::new(format!("Spotify  {}", symbol))
        .style(header_style)
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, chunks[0]);

    let track = &state.track;
    let now_playing = if track.error {
        vec![
            Line::styled(track.artist.clone(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Line::styled(track.album.clone(), Style::default().fg(Color::DarkGray)),
        ]
    } else {
        vec![
            Line::styled(
                track.track.clone().unwrap_or_default(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::from(track.artist.clone()),
            Line::styled(track.album.clone(), Style::default().fg(Color::DarkGray)),
        ]
    };
    let now_playing = Paragraph::new(now_playing).block(Block::default().title("Now Playing").borders(Borders::ALL));
    f.render_widget(now_playing, chunks[1]);

    let ratio = if track.duration_ms > 0 {
        (track.progress_ms as f64 / track.duration_ms as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            format_duration(track.progress_ms),
            format_duration(track.duration_ms)
        ));
    f.render_widget(progress, chunks[2]);

    let queue_title = match &state.queue.error {
        Some(error) => format!("Up Next ({})", error),
        None => format!("Up Next ({})", state.queue.queue.len()),
    };
    let items: Vec<ListItem> = state
        .queue
        .queue
        .iter()
        .enumerate()
        .map(|(i, item)| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>3}. ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::raw(item.name.clone()),
                Span::styled(format!(" - {}", item.artist), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!("  {}", format_duration(item.duration_ms)),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let queue = List::new(items)
        .block(Block::default().title(queue_title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    let mut list_state = state.list_state.clone();
    f.render_stateful_widget(queue, chunks[3], &mut list_state);

    let footer = if state.status_message.is_empty() {
        Paragraph::new("space play/pause  n/p next/prev  s skip  enter skip to  P play  r refresh  q quit")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(state.status_message.clone()).style(Style::default().fg(Color::Yellow))
    };
    f.render_widget(footer.block(Block::default().borders(Borders::TOP)), chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::model::QueueItem;

    fn item(name: &str) -> QueueItem {
        QueueItem {
            id: name.to_string(),
            name: name.to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            album_art: String::new(),
            duration_ms: 200_000,
            uri: format!("spotify:track:{}", name),
        }
    }

    fn playing(name: &str) -> TrackInfo {
        TrackInfo {
            is_playing: true,
            track: Some(name.to_string()),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            album_art: String::new(),
            progress_ms: 0,
            duration_ms: 200_000,
            error: false,
        }
    }

    fn with_queue(names: &[&str]) -> PanelState {
        let mut state = PanelState::new();
        state.apply(PanelMessage::UpdateQueue(QueueSnapshot {
            currently_playing: None,
            queue: names.iter().map(|n| item(n)).collect(),
            error: None,
        }));
        state
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(61_999), "1:01");
        assert_eq!(format_duration(600_000), "10:00");
    }

    #[test]
    fn test_enter_skips_to_selected_row() {
        let mut state = with_queue(&["a", "b", "c"]);
        state.handle_key(KeyCode::Down);
        state.handle_key(KeyCode::Down);

        assert_eq!(
            state.handle_key(KeyCode::Enter),
            Some(KeyAction::Send(PanelCommand::SkipTracks { count: Some(json!(3)) }))
        );
        assert_eq!(state.status_message, "Skipping 3 tracks...");
    }

    #[test]
    fn test_play_from_queue_sends_upcoming_uris() {
        let mut state = with_queue(&["a", "b"]);
        state.handle_key(KeyCode::Down);

        assert_eq!(
            state.handle_key(KeyCode::Char('P')),
            Some(KeyAction::Send(PanelCommand::PlayFromQueue {
                track_uri: Some(json!("spotify:track:b")),
                queue_uris: Some(json!(["spotify:track:a", "spotify:track:b"])),
            }))
        );
    }

    #[test]
    fn test_empty_queue_keys_do_nothing() {
        let mut state = PanelState::new();
        assert_eq!(state.handle_key(KeyCode::Enter), None);
        assert_eq!(state.handle_key(KeyCode::Char('P')), None);
        assert_eq!(state.handle_key(KeyCode::Char('q')), Some(KeyAction::Quit));
    }

    #[test]
    fn test_selection_wraps_and_clamps() {
        let mut state = with_queue(&["a", "b", "c"]);
        assert_eq!(state.list_state.selected(), Some(0));
        state.handle_key(KeyCode::Up);
        assert_eq!(state.list_state.selected(), Some(2));

        state.apply(PanelMessage::UpdateQueue(QueueSnapshot {
            currently_playing: None,
            queue: vec![item("a")],
            error: None,
        }));
        assert_eq!(state.list_state.selected(), Some(0));
    }

    #[test]
    fn test_track_change_detection() {
        let mut state = PanelState::new();
        assert!(state.apply(PanelMessage::UpdateTrack(playing("one"))));
        assert!(!state.apply(PanelMessage::UpdateTrack(playing("one"))));
        assert!(!state.apply(PanelMessage::UpdateTrack(TrackInfo::status("No track playing", ""))));
        assert!(state.apply(PanelMessage::UpdateTrack(playing("two"))));
    }

    #[test]
    fn test_errors_become_status_line() {
        let mut state = PanelState::new();
        state.apply(PanelMessage::Error {
            message: "Failed to skip track: Request timeout".to_string(),
        });
        assert_eq!(state.status_message, "Failed to skip track: Request timeout");
        assert!(state.status_message_time.is_some());
    }
}
