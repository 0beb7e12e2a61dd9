use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::ActionSequence;

/// One driver command, as read from a command source.
///
/// Tagged by `command`:
/// `{"command": "execute_script", "script": "return 1;"}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    PerformActions {
        actions: Vec<ActionSequence>,
    },
    ReleaseActions,
    ExecuteScript {
        script: String,
        #[serde(default)]
        args: Vec<Value>,
    },
    ExecuteAsyncScript {
        script: String,
        #[serde(default)]
        args: Vec<Value>,
        /// Overrides the session script timeout for this call only.
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    FindElement {
        using: String,
        value: String,
    },
    FindElements {
        using: String,
        value: String,
    },
    GetAlertText,
    AcceptAlert {
        #[serde(default)]
        text: Option<String>,
    },
    DismissAlert,
    SendAlertText {
        text: String,
    },
    SetTimeouts {
        script_ms: u64,
    },
    Quit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PerformActions { .. } => "perform_actions",
            Self::ReleaseActions => "release_actions",
            Self::ExecuteScript { .. } => "execute_script",
            Self::ExecuteAsyncScript { .. } => "execute_async_script",
            Self::FindElement { .. } => "find_element",
            Self::FindElements { .. } => "find_elements",
            Self::GetAlertText => "get_alert_text",
            Self::AcceptAlert { .. } => "accept_alert",
            Self::DismissAlert => "dismiss_alert",
            Self::SendAlertText { .. } => "send_alert_text",
            Self::SetTimeouts { .. } => "set_timeouts",
            Self::Quit => "quit",
        }
    }

    /// Commands that may run while a dialog is waiting for an answer.
    pub fn tolerates_open_dialog(&self) -> bool {
        matches!(
            self,
            Self::GetAlertText
                | Self::AcceptAlert { .. }
                | Self::DismissAlert
                | Self::SendAlertText { .. }
                | Self::Quit
        )
    }
}
