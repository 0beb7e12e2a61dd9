use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::event::PrimitiveEvent;
use super::input_state::InputState;
use super::queue::EventQueue;
use crate::actions::{Action, ActionKind, ActionSequence, PointerOrigin, extract_action_sequence};
use crate::engine::{ElementRef, Engine};
use crate::error::Result;

/// Outcome of one successful `perform_actions` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub ticks: usize,
    pub replayed: usize,
}

/// Turns action commands into replayed engine primitives.
///
/// Owns the coalescing queue and the session's input state table. Not shared
/// across threads: only the command thread drives it.
#[derive(Debug, Default)]
pub struct ActionDispatcher {
    queue: EventQueue,
    state: InputState,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    /// Compile a whole command, then walk its ticks through the queue.
    ///
    /// Nothing is replayed if any action fails validation. Every tick is
    /// appended to the queue before the single replay at the end; a tick's
    /// pause sleeps without splitting the queue.
    pub fn compile_and_dispatch(
        &mut self,
        engine: &dyn Engine,
        sequences: &[ActionSequence],
    ) -> Result<DispatchReport> {
        let matrix = extract_action_sequence(sequences)?;
        self.state.register_devices(&matrix.devices)?;

        let mut report = DispatchReport {
            ticks: matrix.len(),
            replayed: 0,
        };
        for tick in &matrix.ticks {
            for action in &tick.actions {
                if let Some(event) = self.event_for(action) {
                    self.queue.push(event);
                }
            }
            let pause = tick.pause();
            if pause > 0 {
                trace!(target: "pagepilot::dispatch", tick = tick.index, pause, "pausing");
                thread::sleep(Duration::from_millis(pause));
            }
        }
        report.replayed = self.flush(engine)?;

        info!(
            target: "pagepilot::dispatch",
            ticks = report.ticks, replayed = report.replayed,
            "actions performed"
        );
        Ok(report)
    }

    /// Release every key and button still held, most recent first, then
    /// forget all device state.
    pub fn release_all(&mut self, engine: &dyn Engine) -> Result<()> {
        self.queue.clear();
        let keys: Vec<String> = self.state.held_keys().iter().rev().cloned().collect();
        let buttons: Vec<_> = self.state.held_buttons().iter().rev().cloned().collect();
        debug!(
            target: "pagepilot::dispatch",
            keys = keys.len(), buttons = buttons.len(),
            "releasing held input"
        );

        let result = self.release_held(engine, &keys, &buttons);
        self.state.reset();
        result
    }

    fn release_held(
        &mut self,
        engine: &dyn Engine,
        keys: &[String],
        buttons: &[(Option<ElementRef>, u32)],
    ) -> Result<()> {
        for key in keys {
            engine.release_key(None, key)?;
            self.state.key_released(key);
        }
        for (target, button) in buttons {
            engine.mouse_up(target.as_ref(), *button, self.state.modifiers())?;
            self.state.button_released(*button);
        }
        Ok(())
    }

    fn flush(&mut self, engine: &dyn Engine) -> Result<usize> {
        if self.queue.is_empty() {
            return Ok(0);
        }
        self.queue.flush(engine, &mut self.state)
    }

    /// Primitive event implied by one action; `None` for inert actions.
    fn event_for(&mut self, action: &Action) -> Option<PrimitiveEvent> {
        let device = action.device_id.as_str();
        match &action.kind {
            ActionKind::Pause { .. } | ActionKind::PointerCancel { .. } => None,
            ActionKind::KeyDown { key } => Some(PrimitiveEvent::KeyDown {
                target: None,
                key: key.clone(),
            }),
            ActionKind::KeyUp { key } => Some(PrimitiveEvent::KeyUp {
                target: None,
                key: key.clone(),
            }),
            ActionKind::PointerDown { button, target, .. } => Some(PrimitiveEvent::MouseDown {
                target: self.pointer_target(device, target.as_ref()),
                button: *button,
            }),
            ActionKind::PointerUp { button, target, .. } => Some(PrimitiveEvent::MouseUp {
                target: self.pointer_target(device, target.as_ref()),
                button: *button,
            }),
            ActionKind::PointerMove { origin, .. } => match origin {
                PointerOrigin::Element(element) => {
                    self.state.set_last_target(device, Some(element.clone()));
                    Some(PrimitiveEvent::MouseMove {
                        target: Some(element.clone()),
                    })
                }
                PointerOrigin::Viewport => {
                    self.state.set_last_target(device, None);
                    None
                }
                PointerOrigin::Pointer => None,
            },
        }
    }

    /// An explicit element wins and becomes the pointer's location; otherwise
    /// the pointer acts where it last was.
    fn pointer_target(
        &mut self,
        device: &str,
        explicit: Option<&ElementRef>,
    ) -> Option<ElementRef> {
        match explicit {
            Some(element) => {
                self.state.set_last_target(device, Some(element.clone()));
                Some(element.clone())
            }
            None => self.state.last_target(device).cloned(),
        }
    }
}
