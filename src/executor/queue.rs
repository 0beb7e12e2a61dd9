use tracing::{debug, trace};

use super::event::PrimitiveEvent;
use super::input_state::InputState;
use crate::engine::Engine;
use crate::error::{DriverError, Result};

/// Button number the engine treats as a context click.
const CONTEXT_BUTTON: u32 = 2;

/// Not-yet-replayed primitive events of the current command.
///
/// The queue is a stack kept fully reduced: each push merges the top two
/// events until no gesture rule applies. Owned by the command thread only.
#[derive(Debug, Default)]
pub struct EventQueue {
    stack: Vec<PrimitiveEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event and coalesce it with its predecessors.
    pub fn push(&mut self, event: PrimitiveEvent) {
        self.stack.push(event);
        while self.stack.len() >= 2 {
            let n = self.stack.len();
            match PrimitiveEvent::merge(&self.stack[n - 2], &self.stack[n - 1]) {
                Some(merged) => {
                    trace!(target: "pagepilot::dispatch", merged = merged.name(), "coalesced");
                    self.stack.truncate(n - 2);
                    self.stack.push(merged);
                }
                None => break,
            }
        }
    }

    pub fn events(&self) -> &[PrimitiveEvent] {
        &self.stack
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Replay every queued event in order against the engine, then clear.
    ///
    /// Stops at the first failure; events already replayed stay applied and
    /// the rest are dropped. Returns the number of events replayed.
    pub fn flush(&mut self, engine: &dyn Engine, state: &mut InputState) -> Result<usize> {
        let events = std::mem::take(&mut self.stack);
        let total = events.len();
        for (replayed, event) in events.iter().enumerate() {
            if let Err(err) = replay(engine, state, event) {
                debug!(
                    target: "pagepilot::dispatch",
                    event = event.name(), replayed, total, error = %err,
                    "replay aborted"
                );
                return Err(err);
            }
        }
        Ok(total)
    }
}

fn ensure_interactable(engine: &dyn Engine, event: &PrimitiveEvent) -> Result<()> {
    if let Some(element) = event.target() {
        if !engine.is_displayed(element)? {
            return Err(DriverError::ElementNotInteractable {
                target: element.to_string(),
                reason: format!("not displayed for {}", event.name()),
            });
        }
        // Hovering a disabled element is allowed.
        let moving = matches!(event, PrimitiveEvent::MouseMove { .. });
        if !moving && !engine.is_enabled(element)? {
            return Err(DriverError::ElementNotInteractable {
                target: element.to_string(),
                reason: format!("disabled for {}", event.name()),
            });
        }
    }
    Ok(())
}

fn replay(engine: &dyn Engine, state: &mut InputState, event: &PrimitiveEvent) -> Result<()> {
    ensure_interactable(engine, event)?;
    let mods = state.modifiers();
    match event {
        PrimitiveEvent::MouseMove { target } => engine.mouse_move(target.as_ref(), mods),
        PrimitiveEvent::MouseDown { target, button } => {
            engine.mouse_down(target.as_ref(), *button, mods)?;
            state.button_pressed(target.as_ref(), *button);
            Ok(())
        }
        PrimitiveEvent::MouseUp { target, button } => {
            engine.mouse_up(target.as_ref(), *button, mods)?;
            state.button_released(*button);
            Ok(())
        }
        PrimitiveEvent::Click { target, button } if *button == CONTEXT_BUTTON => {
            engine.context_click(target.as_ref(), mods)
        }
        PrimitiveEvent::Click { target, button } => engine.click(target.as_ref(), *button, mods),
        PrimitiveEvent::DoubleClick { target } => engine.double_click(target.as_ref(), mods),
        PrimitiveEvent::KeyDown { target, key } => {
            engine.press_key(target.as_ref(), key)?;
            state.key_pressed(key);
            Ok(())
        }
        PrimitiveEvent::KeyUp { target, key } => {
            engine.release_key(target.as_ref(), key)?;
            state.key_released(key);
            Ok(())
        }
        PrimitiveEvent::Keystroke { target, text } => engine.send_keystroke(target.as_ref(), text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ElementRef, EngineCall, Modifiers, RecordingEngine};

    fn el(id: &str) -> Option<ElementRef> {
        Some(ElementRef::new(id))
    }

    fn key_down(k: &str) -> PrimitiveEvent {
        PrimitiveEvent::KeyDown { target: None, key: k.into() }
    }

    fn key_up(k: &str) -> PrimitiveEvent {
        PrimitiveEvent::KeyUp { target: None, key: k.into() }
    }

    #[test]
    fn down_up_becomes_one_click() {
        let mut q = EventQueue::new();
        q.push(PrimitiveEvent::MouseDown { target: el("x"), button: 0 });
        q.push(PrimitiveEvent::MouseUp { target: el("x"), button: 0 });
        assert_eq!(q.events(), [PrimitiveEvent::Click { target: el("x"), button: 0 }]);
    }

    #[test]
    fn two_clicks_cascade_into_double_click() {
        let mut q = EventQueue::new();
        for _ in 0..2 {
            q.push(PrimitiveEvent::MouseDown { target: el("x"), button: 0 });
            q.push(PrimitiveEvent::MouseUp { target: el("x"), button: 0 });
        }
        assert_eq!(q.events(), [PrimitiveEvent::DoubleClick { target: el("x") }]);
    }

    #[test]
    fn clicks_on_different_elements_stay_apart() {
        let mut q = EventQueue::new();
        q.push(PrimitiveEvent::Click { target: el("x"), button: 0 });
        q.push(PrimitiveEvent::Click { target: el("y"), button: 0 });
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn keystrokes_concatenate() {
        let mut q = EventQueue::new();
        q.push(key_down("a"));
        q.push(key_up("a"));
        q.push(key_down("b"));
        q.push(key_up("b"));
        assert_eq!(
            q.events(),
            [PrimitiveEvent::Keystroke { target: None, text: "ab".into() }]
        );
    }

    #[test]
    fn held_key_blocks_merging_below_it() {
        let mut q = EventQueue::new();
        q.push(key_down("\u{E008}"));
        q.push(key_down("a"));
        q.push(key_up("a"));
        q.push(key_up("\u{E008}"));
        assert_eq!(q.len(), 3);
        assert_eq!(q.events()[1], PrimitiveEvent::Keystroke { target: None, text: "a".into() });
    }

    #[test]
    fn flush_replays_in_order_and_clears() {
        let engine = RecordingEngine::new();
        let mut state = InputState::new();
        let mut q = EventQueue::new();
        q.push(PrimitiveEvent::MouseMove { target: el("x") });
        q.push(PrimitiveEvent::Click { target: el("x"), button: 2 });
        q.push(key_down("a"));

        assert_eq!(q.flush(&engine, &mut state).unwrap(), 3);
        assert!(q.is_empty());
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::MouseMove { target: el("x") },
                EngineCall::ContextClick { target: el("x") },
                EngineCall::PressKey { key: "a".into() },
            ]
        );
        assert_eq!(state.held_keys(), ["a".to_string()]);
    }

    #[test]
    fn held_modifiers_reach_mouse_primitives() {
        let engine = RecordingEngine::new();
        let mut state = InputState::new();
        let mut q = EventQueue::new();
        q.push(key_down("\u{E009}"));
        q.push(PrimitiveEvent::Click { target: el("x"), button: 0 });
        q.flush(&engine, &mut state).unwrap();
        assert_eq!(
            engine.calls()[1],
            EngineCall::Click {
                target: el("x"),
                button: 0,
                modifiers: Modifiers { ctrl: true, ..Modifiers::default() },
            }
        );
    }

    #[test]
    fn hidden_target_aborts_remaining_replay() {
        let engine = RecordingEngine::new();
        engine.hide(&ElementRef::new("hidden"));
        let mut state = InputState::new();
        let mut q = EventQueue::new();
        q.push(PrimitiveEvent::Click { target: el("x"), button: 0 });
        q.push(PrimitiveEvent::MouseMove { target: el("hidden") });
        q.push(PrimitiveEvent::Click { target: el("y"), button: 0 });

        let err = q.flush(&engine, &mut state).unwrap_err();
        assert!(matches!(err, DriverError::ElementNotInteractable { .. }));
        assert_eq!(engine.calls().len(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn disabled_target_rejects_click_but_not_hover() {
        let engine = RecordingEngine::new();
        engine.disable(&ElementRef::new("off"));
        let mut state = InputState::new();
        let mut q = EventQueue::new();
        q.push(PrimitiveEvent::Click { target: el("x"), button: 0 });
        q.push(PrimitiveEvent::MouseMove { target: el("off") });
        q.push(PrimitiveEvent::Click { target: el("off"), button: 0 });

        let err = q.flush(&engine, &mut state).unwrap_err();
        match err {
            DriverError::ElementNotInteractable { target, reason } => {
                assert_eq!(target, "element off");
                assert_eq!(reason, "disabled for click");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(engine.calls().len(), 2);
        assert!(q.is_empty());
    }
}
