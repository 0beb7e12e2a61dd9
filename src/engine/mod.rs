/*!
Embedded engine boundary.

The driver never builds DOM trees or evaluates script itself. Everything it
needs from the browser engine goes through the [`Engine`] trait:
- element lookup and visibility queries
- primitive mouse and keyboard operations
- script injection and invocation

[`RecordingEngine`] is the dry-run implementation: it logs and records each
call instead of touching a browser.
*/

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::rendezvous::AsyncResultHost;

pub mod recording;

pub use recording::{EngineCall, RecordingEngine, ScriptHandler};

/// JSON key that marks a serialized web element reference.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Opaque reference into the engine's DOM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// Read an element reference from its web-element JSON form.
    pub fn from_json(value: &Value) -> Option<Self> {
        value
            .as_object()?
            .get(ELEMENT_KEY)?
            .as_str()
            .map(Self::new)
    }

    /// The web-element JSON form of this reference.
    pub fn to_json(&self) -> Value {
        serde_json::json!({ ELEMENT_KEY: self.0 })
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element {}", self.0)
    }
}

/// Locator handed to the DOM collaborator (`css selector`, `xpath`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub using: String,
    pub value: String,
}

/// Modifier keys held while a mouse primitive is replayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// A script the engine has parsed and can invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFunction {
    source: String,
}

impl CompiledFunction {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// One argument passed to [`Engine::run_function`].
#[derive(Debug, Clone)]
pub enum ScriptArg {
    /// Plain JSON value.
    Value(Value),
    /// A DOM element, unwrapped from its web-element JSON form.
    Element(ElementRef),
    /// Callback host for an async script; the engine exposes it to the page.
    Host(AsyncResultHost),
}

impl ScriptArg {
    /// Convert a protocol argument, recognizing web-element objects.
    pub fn from_json(value: Value) -> Self {
        match ElementRef::from_json(&value) {
            Some(element) => Self::Element(element),
            None => Self::Value(value),
        }
    }
}

/// Operations the embedded browser engine provides to the driver.
///
/// Mouse primitives take an optional target; `None` means the last known
/// active element. Key primitives always act on the focused element when no
/// target is given.
pub trait Engine: Send + Sync {
    fn find_element(&self, locator: &Locator) -> Result<ElementRef>;
    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>>;
    fn is_displayed(&self, element: &ElementRef) -> Result<bool>;
    fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    fn mouse_move(&self, target: Option<&ElementRef>, modifiers: Modifiers) -> Result<()>;
    fn mouse_down(&self, target: Option<&ElementRef>, button: u32, modifiers: Modifiers)
    -> Result<()>;
    fn mouse_up(&self, target: Option<&ElementRef>, button: u32, modifiers: Modifiers)
    -> Result<()>;
    fn click(&self, target: Option<&ElementRef>, button: u32, modifiers: Modifiers) -> Result<()>;
    fn double_click(&self, target: Option<&ElementRef>, modifiers: Modifiers) -> Result<()>;
    fn context_click(&self, target: Option<&ElementRef>, modifiers: Modifiers) -> Result<()>;

    fn press_key(&self, target: Option<&ElementRef>, key: &str) -> Result<()>;
    fn release_key(&self, target: Option<&ElementRef>, key: &str) -> Result<()>;
    fn send_keystroke(&self, target: Option<&ElementRef>, text: &str) -> Result<()>;

    /// Parse `code` into an invocable function.
    fn inject_script(&self, code: &str) -> Result<CompiledFunction>;

    /// Invoke a compiled function. Returns once the synchronous part of the
    /// script has run; async scripts report through their [`ScriptArg::Host`].
    fn run_function(&self, function: &CompiledFunction, args: Vec<ScriptArg>) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_ref_reads_web_element_objects() {
        let v = json!({ ELEMENT_KEY: "abc" });
        assert_eq!(ElementRef::from_json(&v), Some(ElementRef::new("abc")));
        assert_eq!(ElementRef::from_json(&json!({"id": "abc"})), None);
        assert_eq!(ElementRef::new("abc").to_json(), v);
    }

    #[test]
    fn script_args_unwrap_elements() {
        assert!(matches!(
            ScriptArg::from_json(json!({ ELEMENT_KEY: "e1" })),
            ScriptArg::Element(e) if e.id() == "e1"
        ));
        assert!(matches!(ScriptArg::from_json(json!(7)), ScriptArg::Value(_)));
    }
}
