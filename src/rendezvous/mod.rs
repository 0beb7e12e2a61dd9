/*!
Cross-thread rendezvous points between the command thread and the engine
thread.

- `dialog`: modal dialogs raised by page script (alert, confirm, prompt,
  beforeunload), answered by the command thread.
- `async_script`: the single pending result of an async script.

These are the only objects shared across the thread boundary.
*/

pub mod async_script;
pub mod dialog;

pub use async_script::{AsyncOutcome, AsyncRendezvous, AsyncResultHost, wrap_async_script};
pub use dialog::{
    DialogKind, DialogRendezvous, DialogResponse, DialogState, DialogTimeouts, ResolutionKind,
};
