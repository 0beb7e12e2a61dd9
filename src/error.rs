use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for driver operations.
pub type Result<T> = StdResult<T, DriverError>;

/// Every failure a driver command can surface to the protocol layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// A raw action field was missing or malformed.
    #[error("invalid argument: `{field}` of action {index} on device '{device}': {reason}")]
    InvalidArgument {
        device: String,
        index: usize,
        field: String,
        reason: String,
    },

    /// The command as a whole was malformed (device list, parameters, lengths).
    #[error("invalid argument: {0}")]
    InvalidInput(String),

    /// The target of an interaction is not displayed or cannot take input.
    #[error("element not interactable: {target} ({reason})")]
    ElementNotInteractable { target: String, reason: String },

    /// Passed through from the DOM collaborator.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// Passed through from the DOM collaborator.
    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("script timed out after {timeout_ms}ms")]
    ScriptTimeout { timeout_ms: u64 },

    /// A dialog was (or is) open while a command expected none.
    #[error("unexpected alert open: {message}")]
    UnhandledAlert { message: String },

    #[error("document unloaded while waiting for the async script result")]
    PageUnloaded,

    #[error("no such alert")]
    NoAlertPresent,

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The script threw before it could hand back control.
    #[error("javascript error: {0}")]
    Javascript(String),
}

impl DriverError {
    /// Build an `InvalidArgument` for a field of one action.
    pub fn invalid_field(
        device: &str,
        index: usize,
        field: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            device: device.to_string(),
            index,
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// The W3C WebDriver error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidInput(_) => "invalid argument",
            Self::ElementNotInteractable { .. } => "element not interactable",
            Self::NoSuchElement(_) => "no such element",
            Self::StaleElement(_) => "stale element reference",
            Self::ScriptTimeout { .. } => "script timeout",
            Self::UnhandledAlert { .. } => "unexpected alert open",
            Self::NoAlertPresent => "no such alert",
            Self::UnsupportedOperation(_) => "unsupported operation",
            Self::Javascript(_) => "javascript error",
            Self::PageUnloaded => "unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_names_the_failing_action() {
        let err = DriverError::invalid_field("mouse1", 3, "button", "missing");
        assert_eq!(err.code(), "invalid argument");
        let text = err.to_string();
        assert!(text.contains("mouse1"));
        assert!(text.contains("action 3"));
        assert!(text.contains("`button`"));
    }

    #[test]
    fn alert_errors_carry_the_dialog_text() {
        let err = DriverError::UnhandledAlert {
            message: "Are you sure?".into(),
        };
        assert_eq!(err.code(), "unexpected alert open");
        assert!(err.to_string().contains("Are you sure?"));
    }
}
