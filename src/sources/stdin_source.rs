//! Stdin command source.
//!
//! Reads newline-delimited JSON commands from standard input (NDJSON style).
//!
//! Behavior:
//! - Each non-empty line is trimmed and parsed as JSON using `serde_json::from_str`.
//! - Successfully parsed values are forwarded through the command channel.
//! - Malformed JSON lines are logged with `warn!` and ignored; reading continues.
//! - EOF, cancellation, or a channel send error ends the task.
//!
//! Example:
//!     echo '{"command":"execute_script","script":"return 1;"}' | pagepilot

use serde_json::Value;
use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use super::CommandSource;

/// Source that reads newline-delimited JSON commands from stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinSource;

impl StdinSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CommandSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "pagepilot::sources", "StdinSource task started (reading lines)");
            pump_lines(io::stdin(), sender, cancel).await;
            trace!(target: "pagepilot::sources", "StdinSource task ended");
        })
    }
}

/// Forward every JSON line of `input` until EOF, cancellation or channel close.
async fn pump_lines<R>(input: R, sender: Sender<Value>, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(input);
    let mut line = String::new();

    loop {
        line.clear();
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                info!(target: "pagepilot::sources", "Stdin reading cancelled");
                break;
            }
            read = reader.read_line(&mut line) => read,
        };
        match read {
            Ok(0) => {
                info!(target: "pagepilot::sources", "EOF on stdin; StdinSource exiting");
                break;
            }
            Ok(_) => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(raw) {
                    Ok(val) => {
                        trace!(target: "pagepilot::sources", "Parsed JSON from stdin line");
                        if let Err(e) = sender.send(val).await {
                            error!(
                                target: "pagepilot::sources",
                                error = %e,
                                "Channel closed while sending stdin command; terminating task"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            target: "pagepilot::sources",
                            error = %e,
                            line = raw,
                            "Failed to parse stdin JSON line"
                        );
                    }
                }
            }
            Err(e) => {
                warn!(
                    target: "pagepilot::sources",
                    error = %e,
                    "Error reading from stdin; terminating task"
                );
                break;
            }
        }
    }
}
