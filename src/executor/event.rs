use crate::engine::ElementRef;

/// Engine-facing event waiting in the queue.
///
/// Compilation only ever produces moves, downs and ups; clicks, double clicks
/// and keystrokes appear through coalescing. A `None` target means the last
/// known active element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveEvent {
    MouseMove {
        target: Option<ElementRef>,
    },
    MouseDown {
        target: Option<ElementRef>,
        button: u32,
    },
    MouseUp {
        target: Option<ElementRef>,
        button: u32,
    },
    Click {
        target: Option<ElementRef>,
        button: u32,
    },
    DoubleClick {
        target: Option<ElementRef>,
    },
    KeyDown {
        target: Option<ElementRef>,
        key: String,
    },
    KeyUp {
        target: Option<ElementRef>,
        key: String,
    },
    Keystroke {
        target: Option<ElementRef>,
        text: String,
    },
}

impl PrimitiveEvent {
    pub fn target(&self) -> Option<&ElementRef> {
        match self {
            Self::MouseMove { target }
            | Self::MouseDown { target, .. }
            | Self::MouseUp { target, .. }
            | Self::Click { target, .. }
            | Self::DoubleClick { target }
            | Self::KeyDown { target, .. }
            | Self::KeyUp { target, .. }
            | Self::Keystroke { target, .. } => target.as_ref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MouseMove { .. } => "mouseMove",
            Self::MouseDown { .. } => "mouseDown",
            Self::MouseUp { .. } => "mouseUp",
            Self::Click { .. } => "click",
            Self::DoubleClick { .. } => "doubleClick",
            Self::KeyDown { .. } => "keyDown",
            Self::KeyUp { .. } => "keyUp",
            Self::Keystroke { .. } => "sendKeystroke",
        }
    }

    /// Merge `next` into its predecessor `prev`, if a gesture rule applies.
    ///
    /// - down + up, same target and button: click
    /// - click + click, same target: double click
    /// - key down + key up, same key: keystroke
    /// - keystroke + keystroke: concatenated keystroke
    ///
    /// Moves never merge.
    pub fn merge(prev: &Self, next: &Self) -> Option<Self> {
        match (prev, next) {
            (
                Self::MouseDown { target: t1, button: b1 },
                Self::MouseUp { target: t2, button: b2 },
            ) if t1 == t2 && b1 == b2 => Some(Self::Click {
                target: t1.clone(),
                button: *b1,
            }),
            (Self::Click { target: t1, .. }, Self::Click { target: t2, .. }) if t1 == t2 => {
                Some(Self::DoubleClick { target: t1.clone() })
            }
            // Key rules match on the key value alone; the earlier event's
            // target is kept.
            (Self::KeyDown { target, key: k1 }, Self::KeyUp { key: k2, .. }) if k1 == k2 => {
                Some(Self::Keystroke {
                    target: target.clone(),
                    text: k1.clone(),
                })
            }
            (Self::Keystroke { target, text: a }, Self::Keystroke { text: b, .. }) => {
                Some(Self::Keystroke {
                    target: target.clone(),
                    text: format!("{a}{b}"),
                })
            }
            _ => None,
        }
    }
}
