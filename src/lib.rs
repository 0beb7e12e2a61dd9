#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! pagepilot: the command core of a browser automation driver.
//!
//! It turns protocol-level action sequences into coalesced input primitives,
//! runs page scripts (sync and async) and mediates modal dialogs between the
//! engine thread and the command thread:
//! - `actions`: raw action sequences, the per-device compiler and the tick matrix.
//! - `engine`: the `Engine` collaborator trait and a recording (dry-run) engine.
//! - `executor`: commands, the coalescing dispatcher and the session runtime.
//! - `rendezvous`: dialog and async-script rendezvous between threads.
//! - `config`: configuration models, loader, and schema helpers.
//! - `sources`: command sources (script file, stdin).
//!
//! Use `pagepilot::prelude::*` to bring commonly used items into scope quickly.

/// Public module: action sequences and their compilation.
pub mod actions;
/// Public module: configuration (models, loader, schema helpers).
pub mod config;
/// Public module: engine collaborator trait and recording engine.
pub mod engine;
/// Public module: driver error taxonomy.
pub mod error;
/// Public module: command execution (dispatcher, runtime).
pub mod executor;
/// Public module: thread rendezvous for dialogs and async scripts.
pub mod rendezvous;
/// Public module: command sources (file, stdin).
pub mod sources;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a simple level name (trace|debug|info|warn|error).
pub fn parse_level(s: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Uses `level` if given, else the `RUST_LOG` environment variable.
/// - Falls back to `info` level.
/// - Logs go to stderr; stdout carries command replies.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing(level: Option<&str>) {
    use tracing_subscriber::fmt;

    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .and_then(|s| parse_level(&s))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use pagepilot::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use crate::error::{DriverError, Result as DriverResult};
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;

    // Core types
    pub use crate as pagepilot;
    pub use crate::config::{Config, SessionOptions, UnexpectedDialogPolicy};
    pub use crate::engine::{ElementRef, Engine, RecordingEngine};
    pub use crate::executor::{Command, Runtime};
    pub use crate::rendezvous::{DialogKind, DialogRendezvous};

    // Frequently used internal modules
    pub use crate::{actions, config, engine, executor, rendezvous, sources};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_parse() {
        assert_eq!(parse_level("WARNING"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("loud"), None);
        assert!(!version().is_empty());
    }
}
