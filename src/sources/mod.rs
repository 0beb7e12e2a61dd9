/*!
Command sources module (orchestration layer).

This module only defines the core `CommandSource` trait and orchestration helpers
(`build_sources_from_config`, `spawn_all_sources`). Concrete implementations
live in their own files:

- `file.rs`         -> `FileSource`  (run the commands of a script file once)
- `stdin_source.rs` -> `StdinSource` (newline-delimited JSON from standard input)

Each source implementation is responsible for:
- Parsing raw input into `serde_json::Value` (one value per command)
- Pushing commands via `Sender<Value>` while respecting backpressure (`send().await`)
- Logging errors and continuing (never panicking inside tasks)
- Stopping when the `CancellationToken` fires or the channel closes

Commands stay raw JSON here; the session decodes them so a malformed command
still gets an error reply.
*/

use serde_json::Value;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Config, SourceConfig};

pub mod file;
pub mod stdin_source;

pub use file::FileSource;
pub use stdin_source::StdinSource;

/// Trait implemented by all command sources.
///
/// A source spawns an asynchronous task that produces JSON commands and sends
/// them into the provided channel, in order. Tasks never panic; they log and
/// continue, or exit on unrecoverable errors and on cancellation.
pub trait CommandSource: Send + Sync {
    /// Static human-readable identifier (used in logs).
    fn name(&self) -> &'static str;

    /// Start the source in the background.
    fn start(&self, sender: Sender<Value>, cancel: CancellationToken) -> JoinHandle<()>;
}

/// Construct all configured sources, in config order.
pub fn build_sources_from_config(cfg: &Config) -> Vec<Box<dyn CommandSource>> {
    cfg.sources
        .iter()
        .map(|sc| -> Box<dyn CommandSource> {
            match sc {
                SourceConfig::File { path } => Box::new(FileSource::new(path.clone())),
                SourceConfig::Stdin => Box::new(StdinSource::new()),
            }
        })
        .collect()
}

/// Spawn every source, returning their `JoinHandle`s.
///
/// All sources share one cancellation token; cancelling it stops them all.
pub fn spawn_all_sources(
    sources: &[Box<dyn CommandSource>],
    sender: Sender<Value>,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    sources
        .iter()
        .map(|src| {
            info!(
                target: "pagepilot::sources",
                source = %src.name(),
                "Starting source task"
            );
            src.start(sender.clone(), cancel.child_token())
        })
        .collect()
}
