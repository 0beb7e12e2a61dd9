use std::collections::HashSet;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{info, trace};

use super::{CompiledFunction, ElementRef, Engine, Locator, Modifiers, ScriptArg};
use crate::error::{DriverError, Result};

/// Stand-in for the engine thread when a script runs.
///
/// Receives the compiled function and its arguments; for async scripts the last
/// argument is the callback host, which the handler may resolve inline or hand
/// to another thread.
pub type ScriptHandler =
    Box<dyn Fn(&CompiledFunction, &[ScriptArg]) -> Result<Value> + Send + Sync>;

/// One call made against a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    MouseMove {
        target: Option<ElementRef>,
    },
    MouseDown {
        target: Option<ElementRef>,
        button: u32,
        modifiers: Modifiers,
    },
    MouseUp {
        target: Option<ElementRef>,
        button: u32,
        modifiers: Modifiers,
    },
    Click {
        target: Option<ElementRef>,
        button: u32,
        modifiers: Modifiers,
    },
    DoubleClick {
        target: Option<ElementRef>,
    },
    ContextClick {
        target: Option<ElementRef>,
    },
    PressKey {
        key: String,
    },
    ReleaseKey {
        key: String,
    },
    SendKeystroke {
        text: String,
    },
    RunFunction {
        source: String,
    },
}

/// Dry-run engine: every primitive is logged and recorded, nothing is simulated.
///
/// Elements are synthesized from their locator, so lookups always succeed
/// unless the element was registered as missing. Visibility defaults to true.
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    hidden: Mutex<HashSet<ElementRef>>,
    disabled: Mutex<HashSet<ElementRef>>,
    missing: Mutex<HashSet<String>>,
    script_handler: Option<ScriptHandler>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            hidden: Mutex::new(HashSet::new()),
            disabled: Mutex::new(HashSet::new()),
            missing: Mutex::new(HashSet::new()),
            script_handler: None,
        }
    }

    /// Install the handler that plays the engine thread for scripts.
    pub fn with_script_handler(mut self, handler: ScriptHandler) -> Self {
        self.script_handler = Some(handler);
        self
    }

    /// Mark an element as not displayed.
    pub fn hide(&self, element: &ElementRef) {
        self.hidden.lock().insert(element.clone());
    }

    /// Mark an element as disabled.
    pub fn disable(&self, element: &ElementRef) {
        self.disabled.lock().insert(element.clone());
    }

    /// Make lookups for this locator value fail with `NoSuchElement`.
    pub fn mark_missing(&self, value: &str) {
        self.missing.lock().insert(value.to_string());
    }

    /// Snapshot of every recorded call, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Recorded input calls only (script runs filtered out).
    pub fn input_calls(&self) -> Vec<EngineCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| !matches!(c, EngineCall::RunFunction { .. }))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }
}

fn label(target: Option<&ElementRef>) -> &str {
    target.map_or("<active>", ElementRef::id)
}

impl Engine for RecordingEngine {
    fn find_element(&self, locator: &Locator) -> Result<ElementRef> {
        if self.missing.lock().contains(&locator.value) {
            return Err(DriverError::NoSuchElement(format!(
                "{} '{}'",
                locator.using, locator.value
            )));
        }
        trace!(target: "pagepilot::engine", using = %locator.using, value = %locator.value, "find_element");
        Ok(ElementRef::new(locator.value.clone()))
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        match self.find_element(locator) {
            Ok(element) => Ok(vec![element]),
            Err(DriverError::NoSuchElement(_)) => Ok(Vec::new()),
            Err(other) => Err(other),
        }
    }

    fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        Ok(!self.hidden.lock().contains(element))
    }

    fn is_enabled(&self, element: &ElementRef) -> Result<bool> {
        Ok(!self.disabled.lock().contains(element))
    }

    fn mouse_move(&self, target: Option<&ElementRef>, modifiers: Modifiers) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), ?modifiers, "DRY-RUN mouse_move");
        self.record(EngineCall::MouseMove {
            target: target.cloned(),
        });
        Ok(())
    }

    fn mouse_down(
        &self,
        target: Option<&ElementRef>,
        button: u32,
        modifiers: Modifiers,
    ) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), button, "DRY-RUN mouse_down");
        self.record(EngineCall::MouseDown {
            target: target.cloned(),
            button,
            modifiers,
        });
        Ok(())
    }

    fn mouse_up(&self, target: Option<&ElementRef>, button: u32, modifiers: Modifiers) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), button, "DRY-RUN mouse_up");
        self.record(EngineCall::MouseUp {
            target: target.cloned(),
            button,
            modifiers,
        });
        Ok(())
    }

    fn click(&self, target: Option<&ElementRef>, button: u32, modifiers: Modifiers) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), button, ?modifiers, "DRY-RUN click");
        self.record(EngineCall::Click {
            target: target.cloned(),
            button,
            modifiers,
        });
        Ok(())
    }

    fn double_click(&self, target: Option<&ElementRef>, _modifiers: Modifiers) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), "DRY-RUN double_click");
        self.record(EngineCall::DoubleClick {
            target: target.cloned(),
        });
        Ok(())
    }

    fn context_click(&self, target: Option<&ElementRef>, _modifiers: Modifiers) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), "DRY-RUN context_click");
        self.record(EngineCall::ContextClick {
            target: target.cloned(),
        });
        Ok(())
    }

    fn press_key(&self, target: Option<&ElementRef>, key: &str) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), key = %key.escape_unicode(), "DRY-RUN press_key");
        self.record(EngineCall::PressKey {
            key: key.to_string(),
        });
        Ok(())
    }

    fn release_key(&self, target: Option<&ElementRef>, key: &str) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), key = %key.escape_unicode(), "DRY-RUN release_key");
        self.record(EngineCall::ReleaseKey {
            key: key.to_string(),
        });
        Ok(())
    }

    fn send_keystroke(&self, target: Option<&ElementRef>, text: &str) -> Result<()> {
        info!(target: "pagepilot::engine", element = label(target), %text, "DRY-RUN send_keystroke");
        self.record(EngineCall::SendKeystroke {
            text: text.to_string(),
        });
        Ok(())
    }

    fn inject_script(&self, code: &str) -> Result<CompiledFunction> {
        trace!(target: "pagepilot::engine", len = code.len(), "inject_script");
        Ok(CompiledFunction::new(code))
    }

    fn run_function(&self, function: &CompiledFunction, args: Vec<ScriptArg>) -> Result<Value> {
        info!(target: "pagepilot::engine", args = args.len(), "DRY-RUN run_function");
        self.record(EngineCall::RunFunction {
            source: function.source().to_string(),
        });
        match &self.script_handler {
            Some(handler) => handler(function, &args),
            None => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let engine = RecordingEngine::new();
        let el = ElementRef::new("e1");
        engine.click(Some(&el), 0, Modifiers::default()).unwrap();
        engine.send_keystroke(None, "hi").unwrap();
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Click {
                    target: Some(el),
                    button: 0,
                    modifiers: Modifiers::default()
                },
                EngineCall::SendKeystroke { text: "hi".into() },
            ]
        );
    }

    #[test]
    fn hidden_and_missing_elements() {
        let engine = RecordingEngine::new();
        let locator = Locator {
            using: "css selector".into(),
            value: "#go".into(),
        };
        let el = engine.find_element(&locator).unwrap();
        assert!(engine.is_displayed(&el).unwrap());
        engine.hide(&el);
        assert!(!engine.is_displayed(&el).unwrap());
        assert!(engine.is_enabled(&el).unwrap());
        engine.disable(&el);
        assert!(!engine.is_enabled(&el).unwrap());

        engine.mark_missing("#go");
        assert!(matches!(
            engine.find_element(&locator),
            Err(DriverError::NoSuchElement(_))
        ));
        assert!(engine.find_elements(&locator).unwrap().is_empty());
    }
}
