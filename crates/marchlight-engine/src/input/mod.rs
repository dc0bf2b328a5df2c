//! Input subsystem.
//!
//! The renderer only consumes the cursor. Public API does not expose winit
//! types; the runtime translates platform events into `InputEvent`s.

mod pointer;

pub use pointer::{clamp_cursor, InputEvent, PointerState};
