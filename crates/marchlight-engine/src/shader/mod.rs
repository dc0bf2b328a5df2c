//! Shader sources and program construction.
//!
//! Flow: `ShaderSources::load` reads the two WGSL files, `ProgramBuilder`
//! compiles both stages through a [`RenderBackend`](crate::gfx::RenderBackend),
//! links them and releases the stage objects. `wgsl` is the compiler front
//! used by the wgpu backend.

mod error;
mod program;
mod source;
pub mod wgsl;

pub use error::{ProgramError, SourceError};
pub use program::ProgramBuilder;
pub use source::{ShaderPaths, ShaderPolicy, ShaderSource, ShaderSources, ShaderStage};
