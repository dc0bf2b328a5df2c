//! Per-frame driver: owns the pipeline resources and runs the
//! clear → program → uniforms → volume → draw → present sequence.

mod config;
mod driver;
mod uniforms;

pub use config::PipelineConfig;
pub use driver::{DriverState, FrameDriver, FrameHost, FrameOutcome, VOLUME_UNIT};
pub use uniforms::{FrameInput, FrameUniforms};
