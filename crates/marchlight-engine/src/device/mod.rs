//! GPU device and render targets.
//!
//! [`Gpu`] owns the device and a window swapchain paced by FIFO present.
//! [`OffscreenTarget`] owns a device and one color texture, for rendering
//! without a window.

mod gpu;
mod init;
mod offscreen;
mod surface;

pub use gpu::{Gpu, GpuFrame, SurfaceErrorAction};
pub use init::GpuInit;
pub use offscreen::OffscreenTarget;
