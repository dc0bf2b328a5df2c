//! Rendering backend seam.
//!
//! The renderer talks to the GPU through [`RenderBackend`]: handle-based
//! create/release calls plus an explicit per-frame call sequence.
//! [`WgpuBackend`] is the real implementation.

mod backend;
mod handle;
mod types;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::RenderBackend;
pub use handle::{GeometryHandle, ProgramHandle, StageHandle, VolumeHandle};
pub use types::{
    AddressMode, AttributeFormat, Color, FilterMode, FrameStatus, SamplerDesc, TexelFormat,
    VertexAttribute, VertexLayout, VolumeDesc,
};
pub use wgpu_backend::WgpuBackend;
