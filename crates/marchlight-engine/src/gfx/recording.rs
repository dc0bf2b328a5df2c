//! In-memory backend that records every call. Test-only.

use std::collections::{HashSet, VecDeque};

use crate::frame::FrameUniforms;
use crate::shader::{ShaderSource, ShaderStage};

use super::handle::{GeometryHandle, ProgramHandle, Slots, StageHandle, VolumeHandle};
use super::types::{Color, FrameStatus, VertexLayout, VolumeDesc};
use super::RenderBackend;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CompileStage(ShaderStage),
    ReleaseStage(StageHandle),
    LinkProgram(ProgramHandle),
    ReleaseProgram(ProgramHandle),
    CreateGeometry(GeometryHandle),
    ReleaseGeometry(GeometryHandle),
    CreateVolume(VolumeHandle),
    WriteVolume { origin: [u32; 3], size: [u32; 3], len: usize },
    ReleaseVolume(VolumeHandle),
    Resize(u32, u32),
    BeginFrame,
    Clear(Color),
    UseProgram(ProgramHandle),
    WriteUniforms(FrameUniforms),
    BindVolume { unit: u32, volume: VolumeHandle },
    DrawIndexed { geometry: GeometryHandle, index_count: u32 },
    Present,
}

impl Call {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Call::CompileStage(_) => "compile_stage",
            Call::ReleaseStage(_) => "release_stage",
            Call::LinkProgram(_) => "link_program",
            Call::ReleaseProgram(_) => "release_program",
            Call::CreateGeometry(_) => "create_geometry",
            Call::ReleaseGeometry(_) => "release_geometry",
            Call::CreateVolume(_) => "create_volume",
            Call::WriteVolume { .. } => "write_volume",
            Call::ReleaseVolume(_) => "release_volume",
            Call::Resize(..) => "resize",
            Call::BeginFrame => "begin_frame",
            Call::Clear(_) => "clear",
            Call::UseProgram(_) => "use_program",
            Call::WriteUniforms(_) => "write_uniforms",
            Call::BindVolume { .. } => "bind_volume",
            Call::DrawIndexed { .. } => "draw_indexed",
            Call::Present => "present",
        }
    }
}

pub(crate) struct RecordedGeometry {
    pub(crate) vertices: Vec<u8>,
    pub(crate) indices: Vec<u16>,
    pub(crate) layout: VertexLayout,
}

pub(crate) struct RecordedVolume {
    pub(crate) desc: VolumeDesc,
    pub(crate) texels: Vec<u8>,
}

/// Records calls and tracks live handles.
///
/// Releasing an unknown handle or drawing outside a frame panics, so tests
/// catch double frees and out-of-order calls.
#[derive(Default)]
pub(crate) struct RecordingBackend {
    pub(crate) calls: Vec<Call>,

    stages: Slots<(ShaderStage, bool)>,
    programs: Slots<bool>,
    pub(crate) geometries: Slots<RecordedGeometry>,
    pub(crate) volumes: Slots<RecordedVolume>,

    pub(crate) stages_released: usize,
    failing_stages: HashSet<ShaderStage>,
    fail_link: bool,
    fail_volume_write: bool,
    frame_script: VecDeque<FrameStatus>,
    in_frame: bool,
}

impl RecordingBackend {
    pub(crate) fn failing_compile(mut self, stage: ShaderStage) -> Self {
        self.failing_stages.insert(stage);
        self
    }

    pub(crate) fn failing_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub(crate) fn failing_volume_write(mut self) -> Self {
        self.fail_volume_write = true;
        self
    }

    /// Queues results for upcoming `begin_frame` calls; `Ready` once drained.
    pub(crate) fn script_frames(mut self, statuses: impl IntoIterator<Item = FrameStatus>) -> Self {
        self.frame_script.extend(statuses);
        self
    }

    pub(crate) fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub(crate) fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub(crate) fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub(crate) fn live_volumes(&self) -> usize {
        self.volumes.len()
    }

    pub(crate) fn live_total(&self) -> usize {
        self.live_stages() + self.live_programs() + self.live_geometries() + self.live_volumes()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub(crate) fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn compile_stage(&mut self, source: &ShaderSource) -> StageHandle {
        let ok = !self.failing_stages.contains(&source.stage);
        self.calls.push(Call::CompileStage(source.stage));
        StageHandle(self.stages.insert((source.stage, ok)))
    }

    fn stage_status(&self, stage: StageHandle) -> Result<(), String> {
        match self.stages.get(stage.0) {
            Some((_, true)) => Ok(()),
            Some((s, false)) => Err(format!("{s} stage rejected")),
            None => Err("unknown stage".into()),
        }
    }

    fn release_stage(&mut self, stage: StageHandle) {
        assert!(self.stages.remove(stage.0).is_some(), "stage {stage:?} released twice");
        self.stages_released += 1;
        self.calls.push(Call::ReleaseStage(stage));
    }

    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
        _layout: &VertexLayout,
    ) -> ProgramHandle {
        let ok = !self.fail_link
            && self.stage_status(vertex).is_ok()
            && self.stage_status(fragment).is_ok();
        let handle = ProgramHandle(self.programs.insert(ok));
        self.calls.push(Call::LinkProgram(handle));
        handle
    }

    fn program_status(&self, program: ProgramHandle) -> Result<(), String> {
        match self.programs.get(program.0) {
            Some(true) => Ok(()),
            Some(false) => Err("link rejected".into()),
            None => Err("unknown program".into()),
        }
    }

    fn release_program(&mut self, program: ProgramHandle) {
        assert!(self.programs.remove(program.0).is_some(), "program {program:?} released twice");
        self.calls.push(Call::ReleaseProgram(program));
    }

    fn create_geometry(
        &mut self,
        vertices: &[u8],
        indices: &[u16],
        layout: &VertexLayout,
    ) -> GeometryHandle {
        let handle = GeometryHandle(self.geometries.insert(RecordedGeometry {
            vertices: vertices.to_vec(),
            indices: indices.to_vec(),
            layout: *layout,
        }));
        self.calls.push(Call::CreateGeometry(handle));
        handle
    }

    fn release_geometry(&mut self, geometry: GeometryHandle) {
        assert!(
            self.geometries.remove(geometry.0).is_some(),
            "geometry {geometry:?} released twice"
        );
        self.calls.push(Call::ReleaseGeometry(geometry));
    }

    fn create_volume(&mut self, desc: &VolumeDesc) -> VolumeHandle {
        let handle = VolumeHandle(self.volumes.insert(RecordedVolume {
            desc: *desc,
            texels: vec![0; desc.byte_len()],
        }));
        self.calls.push(Call::CreateVolume(handle));
        handle
    }

    fn write_volume(
        &mut self,
        volume: VolumeHandle,
        origin: [u32; 3],
        size: [u32; 3],
        texels: &[u8],
    ) -> anyhow::Result<()> {
        self.calls.push(Call::WriteVolume { origin, size, len: texels.len() });
        anyhow::ensure!(!self.fail_volume_write, "volume write rejected");

        let Some(vol) = self.volumes.get_mut(volume.0) else {
            anyhow::bail!("unknown volume {volume:?}");
        };
        let [w, h, _] = vol.desc.extent;
        let bpt = vol.desc.format.bytes_per_texel() as usize;
        let row = size[0] as usize * bpt;
        let mut src = 0;
        for z in 0..size[2] {
            for y in 0..size[1] {
                let dst = (((origin[2] + z) * h + origin[1] + y) * w + origin[0]) as usize * bpt;
                vol.texels[dst..dst + row].copy_from_slice(&texels[src..src + row]);
                src += row;
            }
        }
        Ok(())
    }

    fn release_volume(&mut self, volume: VolumeHandle) {
        assert!(self.volumes.remove(volume.0).is_some(), "volume {volume:?} released twice");
        self.calls.push(Call::ReleaseVolume(volume));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Resize(width, height));
    }

    fn begin_frame(&mut self) -> FrameStatus {
        assert!(!self.in_frame, "begin_frame while a frame is open");
        self.calls.push(Call::BeginFrame);
        let status = self.frame_script.pop_front().unwrap_or(FrameStatus::Ready);
        self.in_frame = status == FrameStatus::Ready;
        status
    }

    fn clear(&mut self, color: Color) {
        assert!(self.in_frame, "clear outside a frame");
        self.calls.push(Call::Clear(color));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        assert!(self.in_frame, "use_program outside a frame");
        assert!(self.programs.get(program.0).is_some(), "use of released program");
        self.calls.push(Call::UseProgram(program));
    }

    fn write_uniforms(&mut self, uniforms: &FrameUniforms) {
        assert!(self.in_frame, "write_uniforms outside a frame");
        self.calls.push(Call::WriteUniforms(*uniforms));
    }

    fn bind_volume(&mut self, unit: u32, volume: VolumeHandle) {
        assert!(self.in_frame, "bind_volume outside a frame");
        assert!(self.volumes.get(volume.0).is_some(), "bind of released volume");
        self.calls.push(Call::BindVolume { unit, volume });
    }

    fn draw_indexed(&mut self, geometry: GeometryHandle, index_count: u32) {
        assert!(self.in_frame, "draw outside a frame");
        assert!(self.geometries.get(geometry.0).is_some(), "draw of released geometry");
        self.calls.push(Call::DrawIndexed { geometry, index_count });
    }

    fn present(&mut self) {
        assert!(self.in_frame, "present outside a frame");
        self.in_frame = false;
        self.calls.push(Call::Present);
    }
}
