//! JSON-lines bridge for editor hosts
//!
//! The host spawns `spotify-widget panel --json`, writes one `PanelCommand`
//! object per line to stdin and renders the `PanelMessage` objects that
//! arrive one per line on stdout. Closing stdin disposes the panel.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::panel::{PanelCommand, PanelMessage, PanelSession};

const CHANNEL_CAPACITY: usize = 32;

/// Run the bridge over process stdin/stdout
pub async fn run_stdio(session: PanelSession) -> Result<()> {
    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    run_bridge(session, reader, tokio::io::stdout()).await?;
    Ok(())
}

/// Run the bridge over arbitrary streams, returning the writer once every
/// pending message has been flushed
pub async fn run_bridge<R, W>(session: PanelSession, reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<PanelCommand>(CHANNEL_CAPACITY);
    let (message_tx, message_rx) = mpsc::channel::<PanelMessage>(CHANNEL_CAPACITY);

    let sync_loop = tokio::spawn(session.run(command_rx, message_tx));
    let writer_task = tokio::spawn(write_messages(message_rx, writer));

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<PanelCommand>(line) {
            Ok(command) => {
                if command_tx.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Ignoring malformed panel frame: {}", e),
        }
    }

    debug!("Host closed the command stream");
    drop(command_tx);
    sync_loop.await?;
    writer_task.await?
}

async fn write_messages<W>(mut messages: mpsc::Receiver<PanelMessage>, mut writer: W) -> Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let mut frame = serde_json::to_vec(&message)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Timings;
    use crate::spotify::SpotifyClient;
    use crate::token::TokenStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_commands_in_messages_out() {
        let server = mockito::Server::new_async().await;
        let client = SpotifyClient::with_base_url(&server.url(), Arc::new(TokenStore::in_memory(None))).unwrap();
        let session = PanelSession::new(client, None, Timings::with_poll_interval(Duration::from_secs(60)));

        let input: &[u8] = b"{\"command\":\"getQueue\"}\nnot json\n\n{\"command\":\"skipTracks\",\"count\":0}\n";
        let output = run_bridge(session, input, Vec::new()).await.unwrap();
        let frames: Vec<PanelMessage> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert!(frames.iter().any(|f| matches!(
            f,
            PanelMessage::UpdateQueue(q) if q.error.as_deref() == Some("Not authenticated")
        )));
        assert!(frames.iter().any(|f| matches!(
            f,
            PanelMessage::Error { message } if message.starts_with("Failed to skip tracks: Invalid skip count")
        )));
    }
}
