//! Windowing runtime (winit).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
