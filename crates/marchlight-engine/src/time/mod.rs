//! Time subsystem.
//!
//! One `FrameClock` per render loop; call `tick()` once per presented frame.
//! `FrameTime::elapsed` is the monotonic "seconds since start" value fed to
//! the shader.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
