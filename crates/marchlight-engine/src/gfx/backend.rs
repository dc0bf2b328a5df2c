use crate::frame::FrameUniforms;
use crate::shader::ShaderSource;

use super::handle::{GeometryHandle, ProgramHandle, StageHandle, VolumeHandle};
use super::types::{Color, FrameStatus, VertexLayout, VolumeDesc};

/// GPU calls the renderer is built from.
///
/// Every `create_*`/`compile_*`/`link_*` call allocates a handle that must be
/// released with the matching `release_*` call. Status queries are separate
/// from allocation: a stage or program that failed still owns a handle.
///
/// Frame calls are only valid between `begin_frame` returning
/// [`FrameStatus::Ready`] and `present`.
pub trait RenderBackend {
    /// Allocates a stage object and compiles `source` into it.
    fn compile_stage(&mut self, source: &ShaderSource) -> StageHandle;

    /// Compile log of a stage; `Err` holds the diagnostic when compilation failed.
    fn stage_status(&self, stage: StageHandle) -> Result<(), String>;

    fn release_stage(&mut self, stage: StageHandle);

    /// Allocates a program, attaches both stages and links it against the
    /// vertex layout it will be drawn with.
    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
        layout: &VertexLayout,
    ) -> ProgramHandle;

    /// Link log of a program; `Err` holds the diagnostic when linking failed.
    fn program_status(&self, program: ProgramHandle) -> Result<(), String>;

    fn release_program(&mut self, program: ProgramHandle);

    /// Uploads immutable vertex and index data.
    fn create_geometry(
        &mut self,
        vertices: &[u8],
        indices: &[u16],
        layout: &VertexLayout,
    ) -> GeometryHandle;

    fn release_geometry(&mut self, geometry: GeometryHandle);

    /// Allocates an uninitialized 3-D texture with its sampler.
    fn create_volume(&mut self, desc: &VolumeDesc) -> VolumeHandle;

    /// Writes tightly packed texels into the box `origin .. origin + size`.
    fn write_volume(
        &mut self,
        volume: VolumeHandle,
        origin: [u32; 3],
        size: [u32; 3],
        texels: &[u8],
    ) -> anyhow::Result<()>;

    fn release_volume(&mut self, volume: VolumeHandle);

    /// Framebuffer resize notification; updates the drawable viewport.
    fn resize(&mut self, width: u32, height: u32);

    /// Acquires the next drawable.
    fn begin_frame(&mut self) -> FrameStatus;

    fn clear(&mut self, color: Color);

    fn use_program(&mut self, program: ProgramHandle);

    /// Writes the uniform block of the active program.
    fn write_uniforms(&mut self, uniforms: &FrameUniforms);

    /// Binds `volume` to texture unit `unit` for the next draw.
    fn bind_volume(&mut self, unit: u32, volume: VolumeHandle);

    /// Draws `index_count` indices of `geometry` as a triangle list.
    fn draw_indexed(&mut self, geometry: GeometryHandle, index_count: u32);

    /// Submits recorded work and presents the drawable.
    fn present(&mut self);
}
