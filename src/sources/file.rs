//! File command source.
//!
//! Reads a command script once and sends its commands in order.
//!
//! Formats:
//! - A JSON array: each element is one command.
//! - Otherwise newline-delimited JSON: each non-empty line is one command.
//!   Lines starting with `//` are comments.
//!
//! Malformed lines are logged and skipped. The task ends after the last
//! command, on cancellation, or when the channel closes.

use serde_json::Value;
use tokio::{fs as afs, sync::mpsc::Sender, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::CommandSource;

/// Source that replays the commands of a script file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
}

impl FileSource {
    pub fn new(path: String) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Split script content into commands, skipping what does not parse.
pub fn parse_script(content: &str) -> Vec<Value> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(commands) => return commands,
            Err(e) => {
                warn!(target: "pagepilot::sources", error = %e, "Script is not a valid JSON array; trying line by line");
            }
        }
    }

    let mut out = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with("//") {
            continue;
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => out.push(value),
            Err(e) => warn!(
                target: "pagepilot::sources",
                line = idx + 1, error = %e,
                "Failed to parse command line; skipping"
            ),
        }
    }
    out
}

impl CommandSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()> {
        let path = self.path.clone();

        tokio::spawn(async move {
            let content = match afs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    error!(target: "pagepilot::sources", %path, error = %e, "Failed to read command file");
                    return;
                }
            };
            let commands = parse_script(&content);
            info!(target: "pagepilot::sources", %path, count = commands.len(), "FileSource loaded commands");

            for command in commands {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(target: "pagepilot::sources", %path, "FileSource cancelled");
                        return;
                    }
                    sent = sender.send(command) => {
                        if let Err(e) = sent {
                            error!(
                                target: "pagepilot::sources",
                                %path, error = %e,
                                "Channel closed; FileSource terminating"
                            );
                            return;
                        }
                    }
                }
            }

            info!(target: "pagepilot::sources", %path, "FileSource finished");
        })
    }
}
