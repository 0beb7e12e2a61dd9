use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::ElementRef;

/// Input source kinds an action sequence can belong to.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    None,
    Key,
    Pointer,
    Wheel,
}

impl DeviceType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(Self::None),
            "key" => Some(Self::Key),
            "pointer" => Some(Self::Pointer),
            "wheel" => Some(Self::Wheel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Key => "key",
            Self::Pointer => "pointer",
            Self::Wheel => "wheel",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pointer flavour, fixed per device for the whole session.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

impl PointerType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mouse" => Some(Self::Mouse),
            "pen" => Some(Self::Pen),
            "touch" => Some(Self::Touch),
            _ => None,
        }
    }
}

/// Where a pointer move is measured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOrigin {
    Viewport,
    Pointer,
    Element(ElementRef),
}

/// A virtual input device taking part in one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub device_type: DeviceType,
    /// Only set for pointer devices.
    pub pointer_type: Option<PointerType>,
}

/// One normalized instruction for one device at one tick.
///
/// Built by the compiler, consumed once by the dispatcher, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub device_id: String,
    pub device_type: DeviceType,
    pub kind: ActionKind,
}

/// Subtype-specific payload of an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Pause {
        duration: u64,
    },
    KeyDown {
        key: String,
    },
    KeyUp {
        key: String,
    },
    PointerDown {
        pointer_type: PointerType,
        button: u32,
        target: Option<ElementRef>,
    },
    PointerUp {
        pointer_type: PointerType,
        button: u32,
        target: Option<ElementRef>,
    },
    PointerMove {
        pointer_type: PointerType,
        origin: PointerOrigin,
        duration: Option<u64>,
    },
    PointerCancel {
        pointer_type: PointerType,
    },
}

impl Action {
    pub fn pause_duration(&self) -> Option<u64> {
        match self.kind {
            ActionKind::Pause { duration } => Some(duration),
            _ => None,
        }
    }
}
