use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::time::Duration;

use crate::rendezvous::DialogTimeouts;

/// Root configuration for a pagepilot session.
///
/// Deserialized from a JSON configuration file:
/// - command `sources` (command script files, stdin)
/// - `session` options applied when the driver session starts
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, Default)]
pub struct Config {
    /// Where commands come from.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Per-session capabilities.
    #[serde(default)]
    #[validate]
    pub session: SessionOptions,
}

/// Session capabilities consumed by the command core.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate, PartialEq, Eq)]
pub struct SessionOptions {
    /// Default timeout for async scripts, in milliseconds.
    #[serde(default = "default_script_timeout_ms")]
    #[validate(maximum = 2_147_483_647)]
    pub script_timeout_ms: u64,

    /// What happens to dialogs raised while no command expects them.
    #[serde(default)]
    pub unexpected_dialog_policy: UnexpectedDialogPolicy,

    /// How long the engine thread waits for a dialog answer before dismissing it.
    #[serde(default = "default_dialog_timeout_ms")]
    #[validate(minimum = 1)]
    #[validate(maximum = 600_000)]
    pub dialog_timeout_ms: u64,

    /// How long dialog commands wait for a dialog to appear.
    #[serde(default = "default_dialog_wait_ms")]
    #[validate(maximum = 60_000)]
    pub dialog_wait_ms: u64,
}

fn default_script_timeout_ms() -> u64 {
    30_000
}

fn default_dialog_timeout_ms() -> u64 {
    5_000
}

fn default_dialog_wait_ms() -> u64 {
    1_000
}

impl SessionOptions {
    pub fn dialog_timeouts(&self) -> DialogTimeouts {
        DialogTimeouts {
            engine_wait: Duration::from_millis(self.dialog_timeout_ms),
            appear_wait: Duration::from_millis(self.dialog_wait_ms),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            script_timeout_ms: default_script_timeout_ms(),
            unexpected_dialog_policy: UnexpectedDialogPolicy::default(),
            dialog_timeout_ms: default_dialog_timeout_ms(),
            dialog_wait_ms: default_dialog_wait_ms(),
        }
    }
}

/// Unexpected-dialog policy.
///
/// `ignore` leaves the dialog open for the dialog commands; every other value
/// answers it on the engine thread without blocking. The `*-and-notify`
/// variants also fail the next command with the dialog's text.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UnexpectedDialogPolicy {
    Accept,
    AcceptAndNotify,
    Dismiss,
    DismissAndNotify,
    #[default]
    Ignore,
}

impl UnexpectedDialogPolicy {
    pub fn notifies(&self) -> bool {
        matches!(self, Self::AcceptAndNotify | Self::DismissAndNotify)
    }
}

/// Command source configuration.
/// Use `type` to select a variant:
/// - "file": run the commands of a script file (NDJSON or a JSON array)
/// - "stdin": read newline-delimited JSON commands from standard input
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    File {
        /// Absolute or relative path to the script.
        path: String,
    },
    Stdin,
}
