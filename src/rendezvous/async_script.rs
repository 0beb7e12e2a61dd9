//! One-shot rendezvous for asynchronous script results.
//!
//! A fresh [`AsyncRendezvous`] is created for every async script. The page side
//! gets an [`AsyncResultHost`] (handed to the engine as the callback host); the
//! command thread blocks in [`AsyncRendezvous::wait`]. The first of completion,
//! timeout, unload or a raised dialog fills the slot; every later resolution is
//! ignored.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{DriverError, Result};

/// Terminal state of one async script.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncOutcome {
    Completed(Value),
    TimedOut,
    Unloaded,
    /// A dialog opened while the script was pending; carries its text.
    AlertRaised(String),
}

impl AsyncOutcome {
    /// Map the outcome to the command result.
    pub fn into_result(self, timeout_ms: u64) -> Result<Value> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::TimedOut => Err(DriverError::ScriptTimeout { timeout_ms }),
            Self::Unloaded => Err(DriverError::PageUnloaded),
            Self::AlertRaised(message) => Err(DriverError::UnhandledAlert { message }),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Option<AsyncOutcome>>,
    resolved: Condvar,
}

impl Shared {
    fn resolve(&self, outcome: AsyncOutcome) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            trace!(target: "pagepilot::script", ?outcome, "slot already resolved; ignoring");
            return false;
        }
        debug!(target: "pagepilot::script", ?outcome, "async script resolved");
        *slot = Some(outcome);
        self.resolved.notify_all();
        true
    }
}

/// Page-facing half of the rendezvous. Cheap to clone; every method returns
/// whether this call was the one that resolved the slot.
#[derive(Debug, Clone)]
pub struct AsyncResultHost {
    shared: Arc<Shared>,
}

impl AsyncResultHost {
    pub fn complete(&self, value: Value) -> bool {
        self.shared.resolve(AsyncOutcome::Completed(value))
    }

    pub fn timed_out(&self) -> bool {
        self.shared.resolve(AsyncOutcome::TimedOut)
    }

    pub fn unloaded(&self) -> bool {
        self.shared.resolve(AsyncOutcome::Unloaded)
    }

    pub fn alert(&self, message: impl Into<String>) -> bool {
        self.shared.resolve(AsyncOutcome::AlertRaised(message.into()))
    }

    pub fn is_resolved(&self) -> bool {
        self.shared.slot.lock().is_some()
    }
}

/// Command-side half of the rendezvous.
#[derive(Debug)]
pub struct AsyncRendezvous {
    shared: Arc<Shared>,
    timeout: Duration,
}

impl AsyncRendezvous {
    pub fn new(timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            timeout,
        }
    }

    pub fn host(&self) -> AsyncResultHost {
        AsyncResultHost {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Block until the slot resolves or the timeout elapses.
    ///
    /// The timeout is itself a resolution, taken under the slot lock, so it
    /// races fairly with a completion arriving at the same moment.
    pub fn wait(self) -> AsyncOutcome {
        // A timeout past the clock's range never expires.
        let deadline = Instant::now().checked_add(self.timeout);
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            let Some(deadline) = deadline else {
                self.shared.resolved.wait(&mut slot);
                continue;
            };
            if self
                .shared
                .resolved
                .wait_until(&mut slot, deadline)
                .timed_out()
                && slot.is_none()
            {
                debug!(
                    target: "pagepilot::script",
                    timeout_ms = self.timeout.as_millis() as u64,
                    "async script timed out"
                );
                *slot = Some(AsyncOutcome::TimedOut);
                return AsyncOutcome::TimedOut;
            }
        }
    }
}

/// Wrap a user script body so the page reports back through the host.
///
/// The wrapper appends the completion callback as the last argument, reports
/// unloads, and arms its own timer at `timeout_ms`. The host is the last
/// argument the engine passes in.
pub fn wrap_async_script(body: &str, timeout_ms: u64) -> String {
    format!(
        "function() {{\n\
         var host = arguments[arguments.length - 1];\n\
         var args = Array.prototype.slice.call(arguments, 0, arguments.length - 1);\n\
         var onUnload = function() {{ host.unloaded(); }};\n\
         window.addEventListener('unload', onUnload);\n\
         var timer = window.setTimeout(function() {{ host.timedOut(); }}, {timeout_ms});\n\
         args.push(function(value) {{\n\
         window.clearTimeout(timer);\n\
         window.removeEventListener('unload', onUnload);\n\
         host.complete(value);\n\
         }});\n\
         (function() {{ {body} }}).apply(this, args);\n\
         }}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    #[test]
    fn completion_wins_and_later_signals_are_ignored() {
        let rv = AsyncRendezvous::new(Duration::from_secs(5));
        let host = rv.host();
        assert!(host.complete(json!(42)));
        assert!(!host.timed_out());
        assert!(!host.alert("late"));
        assert_eq!(rv.wait(), AsyncOutcome::Completed(json!(42)));
    }

    #[test]
    fn completion_from_another_thread_wakes_the_waiter() {
        let rv = AsyncRendezvous::new(Duration::from_secs(5));
        let host = rv.host();
        let started = Instant::now();
        let engine = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            host.complete(json!("done"))
        });
        assert_eq!(rv.wait(), AsyncOutcome::Completed(json!("done")));
        assert!(engine.join().unwrap());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn unbounded_timeout_waits_for_completion() {
        let rv = AsyncRendezvous::new(Duration::from_millis(u64::MAX));
        let host = rv.host();
        let engine = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            host.complete(json!("late but fine"))
        });
        assert_eq!(rv.wait(), AsyncOutcome::Completed(json!("late but fine")));
        assert!(engine.join().unwrap());
    }

    #[test]
    fn completion_just_before_timeout_wins() {
        let rv = AsyncRendezvous::new(Duration::from_millis(200));
        let host = rv.host();
        let engine = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            host.complete(json!(1))
        });
        assert_eq!(rv.wait(), AsyncOutcome::Completed(json!(1)));
        assert!(engine.join().unwrap());
    }

    #[test]
    fn completion_just_after_timeout_is_ignored() {
        let rv = AsyncRendezvous::new(Duration::from_millis(50));
        let host = rv.host();
        let late = host.clone();
        let engine = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            late.complete(json!(1))
        });
        let started = Instant::now();
        assert_eq!(rv.wait(), AsyncOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(!engine.join().unwrap());
        assert!(host.is_resolved());
    }

    #[test]
    fn outcomes_map_to_errors() {
        assert_eq!(
            AsyncOutcome::TimedOut.into_result(1000),
            Err(DriverError::ScriptTimeout { timeout_ms: 1000 })
        );
        assert_eq!(
            AsyncOutcome::Unloaded.into_result(1000),
            Err(DriverError::PageUnloaded)
        );
        assert_eq!(
            AsyncOutcome::AlertRaised("hi".into()).into_result(1000),
            Err(DriverError::UnhandledAlert { message: "hi".into() })
        );
    }

    #[test]
    fn wrapper_embeds_body_and_timeout() {
        let code = wrap_async_script("arguments[0](1);", 750);
        assert!(code.contains("arguments[0](1);"));
        assert!(code.contains("750"));
        assert!(code.contains("host.complete(value)"));
    }
}
