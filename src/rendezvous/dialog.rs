//! Rendezvous between the engine thread and the command thread around modal
//! dialogs.
//!
//! The engine thread enters [`DialogRendezvous::open_dialog`] when page script
//! raises a dialog and blocks (bounded) until the command thread accepts or
//! dismisses it. Each open dialog owns a single-slot channel; resolving takes
//! the dialog out of the rendezvous and sends once, so a dialog can never be
//! answered twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{self as chan, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::async_script::AsyncResultHost;
use crate::config::UnexpectedDialogPolicy;
use crate::error::{DriverError, Result};

/// Kind of modal dialog raised by page script.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

/// How a dialog was answered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResolutionKind {
    Accepted,
    Dismissed,
}

/// The dialog currently open, as seen by the command thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogState {
    pub kind: DialogKind,
    pub message: String,
    /// Prompt only.
    pub default_value: Option<String>,
    /// Text typed into a prompt with `send_keys`.
    pub result_value: Option<String>,
}

/// Answer handed back to page script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogResponse {
    pub resolution: ResolutionKind,
    /// Prompt result; `None` is the script's `null`.
    pub value: Option<String>,
}

impl DialogResponse {
    pub fn accepted(&self) -> bool {
        self.resolution == ResolutionKind::Accepted
    }

    fn dismissed() -> Self {
        Self {
            resolution: ResolutionKind::Dismissed,
            value: None,
        }
    }

    fn resolve(state: &DialogState, resolution: ResolutionKind, text: Option<String>) -> Self {
        let value = match (resolution, state.kind) {
            (ResolutionKind::Accepted, DialogKind::Prompt) => Some(
                text.or_else(|| state.result_value.clone())
                    .or_else(|| state.default_value.clone())
                    .unwrap_or_default(),
            ),
            _ => None,
        };
        Self { resolution, value }
    }
}

/// Timing bounds for both sides of the rendezvous.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DialogTimeouts {
    /// How long the engine thread blocks before resuming on its own.
    pub engine_wait: Duration,
    /// How long the command thread waits for an expected dialog to appear.
    pub appear_wait: Duration,
}

impl Default for DialogTimeouts {
    fn default() -> Self {
        Self {
            engine_wait: Duration::from_secs(5),
            appear_wait: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
struct OpenDialog {
    id: u64,
    state: DialogState,
    responder: Sender<DialogResponse>,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<OpenDialog>,
    next_id: u64,
    policy: UnexpectedDialogPolicy,
    /// Text of an auto-resolved dialog still to be reported ("notify" policies).
    pending_notice: Option<String>,
    /// Async script that a dialog would preempt.
    async_watch: Option<AsyncResultHost>,
}

/// Shared between the command thread and the engine thread (behind `Arc`).
#[derive(Debug)]
pub struct DialogRendezvous {
    slot: Mutex<Slot>,
    appeared: Condvar,
    quitting: AtomicBool,
    timeouts: DialogTimeouts,
}

impl Default for DialogRendezvous {
    fn default() -> Self {
        Self::new(UnexpectedDialogPolicy::default(), DialogTimeouts::default())
    }
}

impl DialogRendezvous {
    pub fn new(policy: UnexpectedDialogPolicy, timeouts: DialogTimeouts) -> Self {
        Self {
            slot: Mutex::new(Slot {
                policy,
                ..Slot::default()
            }),
            appeared: Condvar::new(),
            quitting: AtomicBool::new(false),
            timeouts,
        }
    }

    pub fn policy(&self) -> UnexpectedDialogPolicy {
        self.slot.lock().policy
    }

    pub fn set_policy(&self, policy: UnexpectedDialogPolicy) {
        self.slot.lock().policy = policy;
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    // --- Engine thread -------------------------------------------------------

    /// Called on the engine thread when page script raises a dialog.
    ///
    /// Blocks until the command thread answers, unless the session is quitting
    /// or the policy resolves dialogs automatically. A dialog raised while
    /// another is open is dismissed at once. If nobody answers within the
    /// engine bound, the dialog is dismissed so the page can continue.
    pub fn open_dialog(
        &self,
        kind: DialogKind,
        message: &str,
        default_value: Option<&str>,
    ) -> DialogResponse {
        let state = DialogState {
            kind,
            message: message.to_string(),
            default_value: default_value.map(str::to_string),
            result_value: None,
        };

        let (id, rx) = {
            let mut slot = self.slot.lock();
            if let Some(host) = slot.async_watch.as_ref() {
                host.alert(message);
            }

            if self.is_quitting() {
                let resolution = quit_resolution(slot.policy);
                info!(target: "pagepilot::dialog", ?kind, %message, ?resolution, "session quitting; dialog auto-resolved");
                return DialogResponse::resolve(&state, resolution, None);
            }

            if let Some(open) = slot.current.as_ref() {
                warn!(
                    target: "pagepilot::dialog",
                    ?kind, %message, open = %open.state.message,
                    "dialog raised while another is open; dismissing the new one"
                );
                return DialogResponse::dismissed();
            }

            if let Some(resolution) = auto_resolution(slot.policy) {
                if slot.policy.notifies() {
                    slot.pending_notice = Some(message.to_string());
                }
                info!(target: "pagepilot::dialog", ?kind, %message, ?resolution, "dialog auto-resolved by policy");
                return DialogResponse::resolve(&state, resolution, None);
            }

            let (tx, rx) = chan::bounded(1);
            let id = slot.next_id;
            slot.next_id += 1;
            debug!(target: "pagepilot::dialog", id, ?kind, %message, "dialog open; engine thread waiting");
            slot.current = Some(OpenDialog {
                id,
                state,
                responder: tx,
            });
            self.appeared.notify_all();
            (id, rx)
        };

        match rx.recv_timeout(self.timeouts.engine_wait) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                let mut slot = self.slot.lock();
                if slot.current.as_ref().is_some_and(|d| d.id == id) {
                    slot.current = None;
                    warn!(
                        target: "pagepilot::dialog",
                        id, wait_ms = self.timeouts.engine_wait.as_millis() as u64,
                        "dialog not answered in time; dismissing"
                    );
                    return DialogResponse::dismissed();
                }
                // The command thread took the dialog and answers under the
                // lock, so the response is already in the channel.
                drop(slot);
                rx.try_recv().unwrap_or_else(|_| DialogResponse::dismissed())
            }
            Err(RecvTimeoutError::Disconnected) => DialogResponse::dismissed(),
        }
    }

    // --- Command thread ------------------------------------------------------

    /// Current dialog, waiting briefly for one to appear.
    pub fn current(&self) -> Result<DialogState> {
        let mut slot = self.slot.lock();
        self.wait_for_dialog(&mut slot)?;
        slot.current
            .as_ref()
            .map(|d| d.state.clone())
            .ok_or(DriverError::NoAlertPresent)
    }

    pub fn text(&self) -> Result<String> {
        self.current().map(|state| state.message)
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().current.is_some()
    }

    /// Accept the open dialog. A prompt answers `text`, else what was typed
    /// with [`send_keys`](Self::send_keys), else its default value.
    pub fn accept(&self, text: Option<String>) -> Result<()> {
        self.resolve(ResolutionKind::Accepted, text)
    }

    pub fn dismiss(&self) -> Result<()> {
        self.resolve(ResolutionKind::Dismissed, None)
    }

    /// Type into the open prompt. Other dialog kinds do not take text.
    pub fn send_keys(&self, text: &str) -> Result<()> {
        let mut slot = self.slot.lock();
        self.wait_for_dialog(&mut slot)?;
        let open = slot.current.as_mut().ok_or(DriverError::NoAlertPresent)?;
        if open.state.kind != DialogKind::Prompt {
            return Err(DriverError::ElementNotInteractable {
                target: format!("{:?} dialog", open.state.kind),
                reason: "only prompts accept text".into(),
            });
        }
        open.state.result_value = Some(text.to_string());
        Ok(())
    }

    /// Fail a non-dialog command while a dialog needs attention.
    ///
    /// A notice left by a "notify" policy is reported once; a dialog left open
    /// under the `ignore` policy is reported until it is answered.
    pub fn check_unhandled(&self) -> Result<()> {
        let mut slot = self.slot.lock();
        if let Some(message) = slot.pending_notice.take() {
            return Err(DriverError::UnhandledAlert { message });
        }
        match slot.current.as_ref() {
            Some(open) => Err(DriverError::UnhandledAlert {
                message: open.state.message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Route dialogs raised from now on to this async script's host.
    pub fn watch_async(&self, host: AsyncResultHost) {
        self.slot.lock().async_watch = Some(host);
    }

    pub fn unwatch_async(&self) {
        self.slot.lock().async_watch = None;
    }

    /// Enter teardown: answer any open dialog and stop blocking new ones.
    pub fn begin_quit(&self) {
        self.quitting.store(true, Ordering::SeqCst);
        let mut slot = self.slot.lock();
        let resolution = quit_resolution(slot.policy);
        if let Some(open) = slot.current.take() {
            info!(target: "pagepilot::dialog", id = open.id, ?resolution, "resolving open dialog at quit");
            let response = DialogResponse::resolve(&open.state, resolution, None);
            let _ = open.responder.try_send(response);
        }
        slot.pending_notice = None;
    }

    fn resolve(&self, resolution: ResolutionKind, text: Option<String>) -> Result<()> {
        let mut slot = self.slot.lock();
        self.wait_for_dialog(&mut slot)?;
        let open = slot.current.take().ok_or(DriverError::NoAlertPresent)?;
        let response = DialogResponse::resolve(&open.state, resolution, text);
        debug!(target: "pagepilot::dialog", id = open.id, ?resolution, "dialog resolved");
        if open.responder.try_send(response).is_err() {
            debug!(target: "pagepilot::dialog", id = open.id, "engine thread no longer waiting");
        }
        Ok(())
    }

    /// Bounded wait for the engine thread to register a dialog.
    fn wait_for_dialog(&self, slot: &mut MutexGuard<'_, Slot>) -> Result<()> {
        if slot.current.is_some() {
            return Ok(());
        }
        self.appeared
            .wait_while_for(slot, |s| s.current.is_none(), self.timeouts.appear_wait);
        if slot.current.is_some() {
            Ok(())
        } else {
            Err(DriverError::NoAlertPresent)
        }
    }
}

/// Resolution applied without asking the command thread, if any.
fn auto_resolution(policy: UnexpectedDialogPolicy) -> Option<ResolutionKind> {
    match policy {
        UnexpectedDialogPolicy::Accept | UnexpectedDialogPolicy::AcceptAndNotify => {
            Some(ResolutionKind::Accepted)
        }
        UnexpectedDialogPolicy::Dismiss | UnexpectedDialogPolicy::DismissAndNotify => {
            Some(ResolutionKind::Dismissed)
        }
        UnexpectedDialogPolicy::Ignore => None,
    }
}

fn quit_resolution(policy: UnexpectedDialogPolicy) -> ResolutionKind {
    match policy {
        UnexpectedDialogPolicy::Dismiss | UnexpectedDialogPolicy::DismissAndNotify => {
            ResolutionKind::Dismissed
        }
        _ => ResolutionKind::Accepted,
    }
}
