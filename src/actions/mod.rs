/*!
Action model and compilation.

This module turns protocol-level action sequences into normalized actions:
- `raw`: the per-device sequences as received
- `model`: the normalized `Action` sum type
- `keys`: key value normalization and modifier detection
- `compiler`: per-device-type field validation
- `sequence`: device resolution and tick extraction
*/

pub mod compiler;
pub mod keys;
pub mod model;
pub mod raw;
pub mod sequence;

pub use compiler::compile_action;
pub use model::{Action, ActionKind, Device, DeviceType, PointerOrigin, PointerType};
pub use raw::{ActionSequence, DeviceParameters};
pub use sequence::{Tick, TickMatrix, extract_action_sequence};
