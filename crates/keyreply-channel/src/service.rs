//! Async line service: reads client events from one stream and writes
//! replies to another.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use keyreply_core::{BoxFuture, ClientEvent, Messenger, ReplyTarget, SendError};

use crate::ChannelError;
use crate::wire::{OutboundReply, parse_line};

/// Counters reported when the pump stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub forwarded: u64,
    pub skipped: u64,
}

/// Forward client events read from `reader` into `events` until end of
/// input or `shutdown`. Malformed lines, including ones that are not valid
/// UTF-8, are logged and skipped; only a read error ends the pump early.
///
/// Returns [`ChannelError::Closed`] if the daemon side of `events` is gone.
pub async fn pump<R>(
    mut reader: R,
    events: mpsc::Sender<ClientEvent>,
    shutdown: CancellationToken,
) -> Result<PumpStats, ChannelError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut stats = PumpStats::default();
    info!("Line channel started");

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("Line channel cancelled");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            info!("Chat client input closed");
            break;
        }

        let line = match std::str::from_utf8(trim_line_end(&buf)) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Skipping client line that is not UTF-8");
                stats.skipped += 1;
                continue;
            }
        };

        match parse_line(line) {
            Ok(Some(event)) => {
                events.send(event).await.map_err(|_| ChannelError::Closed)?;
                stats.forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Skipping malformed client line");
                stats.skipped += 1;
            }
        }
    }

    info!(forwarded = stats.forwarded, skipped = stats.skipped, "Line channel stopped");
    Ok(stats)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// [`Messenger`] that writes each reply as one JSON line.
///
/// Concurrent replies are serialized so lines never interleave.
pub struct LineMessenger<W> {
    writer: Mutex<W>,
}

impl<W> LineMessenger<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Take the writer back, e.g. to inspect it in tests.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    async fn write_reply(&self, target: &ReplyTarget, text: &str) -> Result<(), SendError> {
        let line = OutboundReply::new(target, text)
            .to_line()
            .map_err(|e| SendError::Delivery(e.to_string()))?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        debug!(conversation = %target.conversation, "Reply written");
        Ok(())
    }
}

impl<W> Messenger for LineMessenger<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn send_reply<'a>(
        &'a self,
        target: &'a ReplyTarget,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), SendError>> {
        Box::pin(self.write_reply(target, text))
    }
}
