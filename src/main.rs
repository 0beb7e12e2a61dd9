use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pagepilot::config::{self as cfg, Config};
use pagepilot::engine::RecordingEngine;
use pagepilot::executor::Runtime;
use pagepilot::sources::{self, FileSource, StdinSource};

/// pagepilot CLI
#[derive(Debug, Parser)]
#[command(
    name = pagepilot::PKG_NAME,
    version = pagepilot::PKG_VERSION,
    about = "Drive a browser automation session from JSON commands (dry-run engine)"
)]
struct Args {
    /// Path to the JSON configuration file (defaults apply when omitted)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Run the commands of this script file (NDJSON or a JSON array)
    #[arg(long = "commands")]
    commands: Option<PathBuf>,

    /// Set log level (e.g., trace, debug, info, warn, error). Overrides RUST_LOG.
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Print the JSON Schema for the configuration and exit
    #[arg(long = "print-schema")]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    pagepilot::init_tracing(args.log_level.as_deref());

    if args.print_schema {
        cfg::write_schema_to_writer(std::io::stdout())?;
        println!();
        return Ok(());
    }

    info!(version = pagepilot::PKG_VERSION, "Starting pagepilot");

    let config = match &args.config {
        Some(path) => cfg::load_from_path_async(path).await?,
        None => Config::default(),
    };
    debug!(target: "pagepilot", session = ?config.session, "Configuration loaded");

    let mut command_sources = sources::build_sources_from_config(&config);
    if let Some(path) = &args.commands {
        command_sources.push(Box::new(FileSource::new(path.to_string_lossy().into_owned())));
    }
    if command_sources.is_empty() {
        info!("No command sources configured; reading commands from stdin");
        command_sources.push(Box::new(StdinSource::new()));
    }

    let mut runtime = Runtime::new(config.session.clone(), Arc::new(RecordingEngine::new()));

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<Value>(256);
    let handles = sources::spawn_all_sources(&command_sources, tx, &cancel);

    // Main loop: run commands in arrival order until the sources finish,
    // the session quits, or Ctrl+C.
    tokio::select! {
        _ = async {
            while let Some(raw) = rx.recv().await {
                let reply = tokio::task::block_in_place(|| runtime.handle_json(raw));
                println!("{reply}");
                if runtime.has_quit() {
                    break;
                }
            }
        } => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    cancel.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Source task failed");
        }
    }
    if !runtime.has_quit() {
        runtime.quit()?;
    }

    info!("pagepilot exited");
    Ok(())
}
