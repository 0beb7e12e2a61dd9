#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for pagepilot.

This module wires together:
- `command`: the serde-tagged driver commands read from sources
- `dispatcher`: action commands compiled into ticks and replayed as primitives
- `event` / `queue`: primitive events and the coalescing queue that merges them
- `input_state`: per-device state that persists across commands
- `runtime`: the session, routing commands to the dispatcher, scripts and dialogs

Typical usage:
- Construct a `Runtime` with `SessionOptions` and an `Engine`.
- Call `Runtime::run_command` for each incoming `Command`.

Example:
```no_run
use std::sync::Arc;
use pagepilot::config::SessionOptions;
use pagepilot::engine::RecordingEngine;
use pagepilot::executor::{Command, Runtime};

let mut rt = Runtime::new(SessionOptions::default(), Arc::new(RecordingEngine::new()));
let cmd: Command = serde_json::from_str(r#"{"command": "execute_script", "script": "return 1;"}"#).unwrap();
let _ = rt.run_command(&cmd);
```
*/

pub mod command;
pub mod dispatcher;
pub mod event;
pub mod input_state;
pub mod queue;
pub mod runtime;

// Re-exports for convenient access from `pagepilot::executor::*`
pub use command::Command;
pub use dispatcher::{ActionDispatcher, DispatchReport};
pub use event::PrimitiveEvent;
pub use input_state::InputState;
pub use queue::EventQueue;
pub use runtime::Runtime;
