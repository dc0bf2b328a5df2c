use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::device::{Gpu, GpuFrame, GpuInit, OffscreenTarget, SurfaceErrorAction};
use crate::frame::FrameUniforms;
use crate::shader::wgsl::{self, SAMPLER_BINDING, UNIFORM_BINDING, VOLUME_BINDING};
use crate::shader::{ShaderSource, ShaderStage};

use super::backend::RenderBackend;
use super::handle::{GeometryHandle, ProgramHandle, Slots, StageHandle, VolumeHandle};
use super::types::{
    AddressMode, AttributeFormat, Color, FilterMode, FrameStatus, TexelFormat, VertexLayout,
    VolumeDesc,
};

/// Where frames go: a window swapchain, or a texture nobody presents.
enum Target<'w> {
    Window { window: &'w Window, gpu: Gpu<'w> },
    Offscreen(OffscreenTarget),
}

impl Target<'_> {
    fn device(&self) -> &wgpu::Device {
        match self {
            Target::Window { gpu, .. } => gpu.device(),
            Target::Offscreen(t) => t.device(),
        }
    }

    fn queue(&self) -> &wgpu::Queue {
        match self {
            Target::Window { gpu, .. } => gpu.queue(),
            Target::Offscreen(t) => t.queue(),
        }
    }

    fn color_format(&self) -> wgpu::TextureFormat {
        match self {
            Target::Window { gpu, .. } => gpu.surface_format(),
            Target::Offscreen(t) => t.format(),
        }
    }

    fn size(&self) -> (u32, u32) {
        match self {
            Target::Window { gpu, .. } => (gpu.size().width, gpu.size().height),
            Target::Offscreen(t) => t.size(),
        }
    }
}

struct StageSlot {
    stage: ShaderStage,
    compiled: std::result::Result<CompiledStage, String>,
}

struct CompiledStage {
    ir: naga::Module,
    module: wgpu::ShaderModule,
}

struct ProgramSlot {
    linked: std::result::Result<LinkedProgram, String>,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,

    /// Bind group for the last volume drawn with; rebuilt when the volume changes.
    bound: Option<(VolumeHandle, wgpu::BindGroup)>,
}

struct GeometrySlot {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct VolumeSlot {
    desc: VolumeDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// State recorded between `begin_frame` and `present`.
struct ActiveFrame {
    encoder: wgpu::CommandEncoder,
    view: wgpu::TextureView,
    /// `None` when rendering offscreen.
    surface_texture: Option<wgpu::SurfaceTexture>,
    /// Pending clear, consumed by the first render pass of the frame.
    clear: Option<Color>,
    program: Option<ProgramHandle>,
    volume: Option<VolumeHandle>,
}

/// Running totals, logged when the backend is dropped.
#[derive(Debug, Default, Copy, Clone)]
struct Counters {
    frames: u64,
    draws: u64,
    clear_passes: u64,
    bind_groups: u64,
}

/// [`RenderBackend`] on top of wgpu.
///
/// Stage "compilation" is naga parse + validation; the wgpu shader module is
/// only created for stages that passed, so device-level validation never
/// sees invalid WGSL. Linking checks the stage interface against the vertex
/// layout and builds a render pipeline with the fixed group-0 layout.
///
/// Renders into a window ([`WgpuBackend::new`]) or into an offscreen color
/// texture ([`WgpuBackend::offscreen`]); both share the frame logic.
pub struct WgpuBackend<'w> {
    target: Target<'w>,

    stages: Slots<StageSlot>,
    programs: Slots<ProgramSlot>,
    geometries: Slots<GeometrySlot>,
    volumes: Slots<VolumeSlot>,

    frame: Option<ActiveFrame>,

    warned_unlinked_draw: bool,
    counters: Counters,
}

impl WgpuBackend<'static> {
    /// Backend without a window: frames render into a `width` x `height`
    /// color texture and are submitted but never presented.
    pub async fn offscreen(width: u32, height: u32) -> Result<Self> {
        let target = OffscreenTarget::new(width, height)
            .await
            .context("failed to initialize offscreen target")?;
        Ok(Self::with_target(Target::Offscreen(target)))
    }
}

impl<'w> WgpuBackend<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new(window, init)
            .await
            .context("failed to initialize GPU context")?;

        log::debug!(
            "surface format {:?}, size {:?}",
            gpu.surface_format(),
            gpu.size()
        );

        Ok(Self::with_target(Target::Window { window, gpu }))
    }

    fn with_target(target: Target<'w>) -> Self {
        Self {
            target,
            stages: Slots::default(),
            programs: Slots::default(),
            geometries: Slots::default(),
            volumes: Slots::default(),
            frame: None,
            warned_unlinked_draw: false,
            counters: Counters::default(),
        }
    }

    fn link(
        &self,
        vertex: StageHandle,
        fragment: StageHandle,
        layout: &VertexLayout,
    ) -> std::result::Result<LinkedProgram, String> {
        let vs = self.compiled_stage(vertex, ShaderStage::Vertex)?;
        let fs = self.compiled_stage(fragment, ShaderStage::Fragment)?;

        wgsl::check_link(&vs.ir, &fs.ir, layout)?;

        let device = self.target.device();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marchlight program bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: UNIFORM_BINDING,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<FrameUniforms>() as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: VOLUME_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Uint,
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("marchlight pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: vertex_format(a.format),
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("marchlight pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs.module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: layout.array_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs.module,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target.color_format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marchlight frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(LinkedProgram {
            pipeline,
            bind_group_layout,
            uniforms,
            bound: None,
        })
    }

    fn compiled_stage(
        &self,
        handle: StageHandle,
        expected: ShaderStage,
    ) -> std::result::Result<&CompiledStage, String> {
        let slot = self
            .stages
            .get(handle.0)
            .ok_or_else(|| format!("{expected} stage handle is not live"))?;
        if slot.stage != expected {
            return Err(format!("expected a {expected} stage, got {}", slot.stage));
        }
        slot.compiled
            .as_ref()
            .map_err(|_| format!("{expected} stage did not compile"))
    }

    /// Opens a render pass on the active frame, applying a pending clear.
    fn render_pass<'f>(frame: &'f mut ActiveFrame, label: &str) -> wgpu::RenderPass<'f> {
        let load = match frame.clear.take() {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c.r as f64,
                g: c.g as f64,
                b: c.b as f64,
                a: c.a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };

        frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

impl RenderBackend for WgpuBackend<'_> {
    fn compile_stage(&mut self, source: &ShaderSource) -> StageHandle {
        let compiled = wgsl::compile(source.stage, &source.text).map(|ir| {
            let module = self
                .target
                .device()
                .create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(&source.path.display().to_string()),
                    source: wgpu::ShaderSource::Wgsl(source.text.as_str().into()),
                });
            CompiledStage { ir, module }
        });

        StageHandle(self.stages.insert(StageSlot {
            stage: source.stage,
            compiled,
        }))
    }

    fn stage_status(&self, stage: StageHandle) -> std::result::Result<(), String> {
        match self.stages.get(stage.0) {
            Some(slot) => slot.compiled.as_ref().map(|_| ()).map_err(|e| e.clone()),
            None => Err("stage handle is not live".to_string()),
        }
    }

    fn release_stage(&mut self, stage: StageHandle) {
        if self.stages.remove(stage.0).is_none() {
            log::warn!("release of unknown stage {stage:?}");
        }
    }

    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
        layout: &VertexLayout,
    ) -> ProgramHandle {
        let linked = self.link(vertex, fragment, layout);
        ProgramHandle(self.programs.insert(ProgramSlot { linked }))
    }

    fn program_status(&self, program: ProgramHandle) -> std::result::Result<(), String> {
        match self.programs.get(program.0) {
            Some(slot) => slot.linked.as_ref().map(|_| ()).map_err(|e| e.clone()),
            None => Err("program handle is not live".to_string()),
        }
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(program.0).is_none() {
            log::warn!("release of unknown program {program:?}");
        }
    }

    fn create_geometry(
        &mut self,
        vertices: &[u8],
        indices: &[u16],
        _layout: &VertexLayout,
    ) -> GeometryHandle {
        let device = self.target.device();

        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marchlight quad vbo"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marchlight quad ibo"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        GeometryHandle(self.geometries.insert(GeometrySlot { vertices, indices }))
    }

    fn release_geometry(&mut self, geometry: GeometryHandle) {
        if self.geometries.remove(geometry.0).is_none() {
            log::warn!("release of unknown geometry {geometry:?}");
        }
    }

    fn create_volume(&mut self, desc: &VolumeDesc) -> VolumeHandle {
        let device = self.target.device();
        let [width, height, depth] = desc.extent;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("marchlight volume"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: depth,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: texture_format(desc.format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("marchlight volume view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let sampling = desc.sampler.effective_for(desc.format);
        if sampling != desc.sampler {
            log::debug!(
                "{:?} texels are not filterable; sampling with {:?}/{:?}",
                desc.format,
                sampling.min_filter,
                sampling.mag_filter
            );
        }

        let [u, v, w] = sampling.address_mode;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("marchlight volume sampler"),
            address_mode_u: address_mode(u),
            address_mode_v: address_mode(v),
            address_mode_w: address_mode(w),
            mag_filter: filter_mode(sampling.mag_filter),
            min_filter: filter_mode(sampling.min_filter),
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        VolumeHandle(self.volumes.insert(VolumeSlot {
            desc: *desc,
            texture,
            view,
            sampler,
        }))
    }

    fn write_volume(
        &mut self,
        volume: VolumeHandle,
        origin: [u32; 3],
        size: [u32; 3],
        texels: &[u8],
    ) -> Result<()> {
        let slot = self
            .volumes
            .get(volume.0)
            .with_context(|| format!("volume {volume:?} is not live"))?;

        for axis in 0..3 {
            let end = origin[axis].checked_add(size[axis]);
            anyhow::ensure!(
                end.is_some_and(|e| e <= slot.desc.extent[axis]),
                "write box {origin:?}+{size:?} exceeds volume extent {:?}",
                slot.desc.extent
            );
        }

        let bpt = slot.desc.format.bytes_per_texel();
        let expected = size.iter().map(|&s| s as usize).product::<usize>() * bpt as usize;
        anyhow::ensure!(
            texels.len() == expected,
            "expected {expected} texel bytes for {size:?}, got {}",
            texels.len()
        );

        self.target.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &slot.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: origin[0],
                    y: origin[1],
                    z: origin[2],
                },
                aspect: wgpu::TextureAspect::All,
            },
            texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size[0] * bpt),
                rows_per_image: Some(size[1]),
            },
            wgpu::Extent3d {
                width: size[0],
                height: size[1],
                depth_or_array_layers: size[2],
            },
        );

        Ok(())
    }

    fn release_volume(&mut self, volume: VolumeHandle) {
        if self.volumes.remove(volume.0).is_none() {
            log::warn!("release of unknown volume {volume:?}");
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        match &mut self.target {
            Target::Window { gpu, .. } => gpu.resize(PhysicalSize::new(width, height)),
            Target::Offscreen(t) => t.resize(width, height),
        }
    }

    fn begin_frame(&mut self) -> FrameStatus {
        if self.frame.is_some() {
            log::warn!("begin_frame while a frame is active; dropping the previous frame");
            self.frame = None;
        }

        let (width, height) = self.target.size();
        if width == 0 || height == 0 {
            return FrameStatus::Skip;
        }

        let (surface_texture, view, encoder) = match &mut self.target {
            Target::Window { gpu, .. } => match gpu.begin_frame() {
                Ok(GpuFrame {
                    surface_texture,
                    view,
                    encoder,
                }) => (Some(surface_texture), view, encoder),
                Err(err) => {
                    let reason = err.to_string();
                    return match gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                            log::debug!("surface not ready: {reason}");
                            FrameStatus::Skip
                        }
                        SurfaceErrorAction::Fatal => {
                            log::error!("fatal surface error: {reason}");
                            FrameStatus::Fatal
                        }
                    };
                }
            },
            Target::Offscreen(t) => match t.begin_frame() {
                Some((view, encoder)) => (None, view, encoder),
                None => return FrameStatus::Skip,
            },
        };

        self.frame = Some(ActiveFrame {
            encoder,
            view,
            surface_texture,
            clear: None,
            program: None,
            volume: None,
        });
        FrameStatus::Ready
    }

    fn clear(&mut self, color: Color) {
        if let Some(frame) = self.frame.as_mut() {
            frame.clear = Some(color);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if let Some(frame) = self.frame.as_mut() {
            frame.program = Some(program);
        }
    }

    fn write_uniforms(&mut self, uniforms: &FrameUniforms) {
        let Some(program) = self.frame.as_ref().and_then(|f| f.program) else {
            log::warn!("write_uniforms without an active program");
            return;
        };
        if let Some(Ok(linked)) = self.programs.get(program.0).map(|s| s.linked.as_ref()) {
            self.target
                .queue()
                .write_buffer(&linked.uniforms, 0, bytemuck::bytes_of(uniforms));
        }
    }

    fn bind_volume(&mut self, unit: u32, volume: VolumeHandle) {
        // A single sampled volume is bound per program; the unit selects it.
        if unit != 0 {
            log::warn!("texture unit {unit} is not bound by the pipeline layout");
            return;
        }
        if let Some(frame) = self.frame.as_mut() {
            frame.volume = Some(volume);
        }
    }

    fn draw_indexed(&mut self, geometry: GeometryHandle, index_count: u32) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("draw outside of a frame");
            return;
        };
        let (Some(program), Some(volume)) = (frame.program, frame.volume) else {
            log::warn!("draw without a program and a bound volume");
            return;
        };

        let Some(Ok(linked)) = self
            .programs
            .get_mut(program.0)
            .map(|s| s.linked.as_mut())
        else {
            if !self.warned_unlinked_draw {
                log::warn!("program {program:?} is not linked; skipping draw");
                self.warned_unlinked_draw = true;
            }
            return;
        };
        let Some(vol) = self.volumes.get(volume.0) else {
            log::warn!("bound volume {volume:?} is not live");
            return;
        };
        let Some(geo) = self.geometries.get(geometry.0) else {
            log::warn!("geometry {geometry:?} is not live");
            return;
        };

        if linked.bound.as_ref().map(|(h, _)| *h) != Some(volume) {
            let bind_group = self
                .target
                .device()
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("marchlight program bind group"),
                    layout: &linked.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: UNIFORM_BINDING,
                            resource: linked.uniforms.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: VOLUME_BINDING,
                            resource: wgpu::BindingResource::TextureView(&vol.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: SAMPLER_BINDING,
                            resource: wgpu::BindingResource::Sampler(&vol.sampler),
                        },
                    ],
                });
            linked.bound = Some((volume, bind_group));
            self.counters.bind_groups += 1;
        }
        let Some((_, bind_group)) = linked.bound.as_ref() else {
            return;
        };

        let mut rpass = Self::render_pass(frame, "marchlight raymarch pass");
        rpass.set_pipeline(&linked.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, geo.vertices.slice(..));
        rpass.set_index_buffer(geo.indices.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..index_count, 0, 0..1);
        drop(rpass);
        self.counters.draws += 1;
    }

    fn present(&mut self) {
        let Some(mut frame) = self.frame.take() else {
            log::warn!("present without an active frame");
            return;
        };

        // Nothing drew this frame; still honor the clear.
        if frame.clear.is_some() {
            drop(Self::render_pass(&mut frame, "marchlight clear pass"));
            self.counters.clear_passes += 1;
        }
        self.counters.frames += 1;

        let ActiveFrame {
            encoder,
            view,
            surface_texture,
            ..
        } = frame;
        match (&self.target, surface_texture) {
            (Target::Window { window, gpu }, Some(surface_texture)) => {
                window.pre_present_notify();
                gpu.submit(GpuFrame {
                    surface_texture,
                    view,
                    encoder,
                });
            }
            (Target::Offscreen(t), _) => t.submit(encoder),
            (Target::Window { gpu, .. }, None) => {
                gpu.queue().submit(std::iter::once(encoder.finish()));
            }
        }
    }
}

impl Drop for WgpuBackend<'_> {
    fn drop(&mut self) {
        let Counters {
            frames,
            draws,
            clear_passes,
            bind_groups,
        } = self.counters;
        log::debug!(
            "wgpu backend: {frames} frames, {draws} draws, {clear_passes} clear-only passes, \
             {bind_groups} bind groups"
        );

        let live = self.stages.len() + self.programs.len() + self.geometries.len() + self.volumes.len();
        if live > 0 {
            log::debug!("dropping wgpu backend with {live} live GPU objects");
        }
    }
}

fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
    }
}

fn texture_format(format: TexelFormat) -> wgpu::TextureFormat {
    match format {
        TexelFormat::R32Uint => wgpu::TextureFormat::R32Uint,
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameDriver, FrameInput, FrameOutcome, PipelineConfig, VOLUME_UNIT};
    use crate::geometry::{QuadMesh, ScreenQuad};
    use crate::shader::{ProgramBuilder, ProgramError, ShaderPolicy, ShaderSources};
    use crate::volume::{GridExtent, VolumeTexture, VoxelGrid};

    const VS: &str = r#"
        struct VsOut {
            @builtin(position) pos: vec4<f32>,
            @location(0) ndc: vec2<f32>,
        };

        @vertex
        fn vs_main(@location(0) pos: vec2<f32>) -> VsOut {
            var out: VsOut;
            out.pos = vec4<f32>(pos, 0.0, 1.0);
            out.ndc = pos;
            return out;
        }
    "#;

    const FS: &str = r#"
        struct Frame {
            resolution: vec2<f32>,
            mouse: vec2<f32>,
            time: f32,
            volume_unit: u32,
        };

        @group(0) @binding(0) var<uniform> frame: Frame;
        @group(0) @binding(1) var volume: texture_3d<u32>;
        @group(0) @binding(2) var volume_sampler: sampler;

        @fragment
        fn fs_main(@location(0) ndc: vec2<f32>) -> @location(0) vec4<f32> {
            let cell = textureLoad(volume, vec3<i32>(0, 0, 0), 0).r;
            return vec4<f32>(ndc * 0.5 + 0.5, f32(cell), 1.0);
        }
    "#;

    /// Fragment stage reading a varying the vertex stage never writes.
    const FS_UNLINKABLE: &str = r#"
        @fragment fn fs_main(@location(1) v: vec2<f32>) -> @location(0) vec4<f32> {
            return vec4<f32>(v, 0.0, 1.0);
        }
    "#;

    /// `None` when the machine has no adapter at all; callers skip.
    fn headless() -> Option<WgpuBackend<'static>> {
        match pollster::block_on(WgpuBackend::offscreen(64, 48)) {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("skipping: {e:#}");
                None
            }
        }
    }

    fn config(policy: ShaderPolicy) -> PipelineConfig {
        PipelineConfig {
            policy,
            grid_extent: GridExtent::cube(4),
            ..PipelineConfig::default()
        }
    }

    fn input() -> FrameInput {
        FrameInput {
            framebuffer: (64, 48),
            cursor: (10.0, 20.0),
            elapsed: 0.5,
        }
    }

    // ── mapping ───────────────────────────────────────────────────────────

    #[test]
    fn voxel_texels_map_to_r32uint() {
        assert_eq!(texture_format(TexelFormat::R32Uint), wgpu::TextureFormat::R32Uint);
    }

    #[test]
    fn quad_attribute_maps_to_float32x2() {
        let f = vertex_format(AttributeFormat::Float32x2);
        assert_eq!(f, wgpu::VertexFormat::Float32x2);
        assert_eq!(f.size(), AttributeFormat::Float32x2.size());
    }

    #[test]
    fn sampler_state_maps_one_to_one() {
        assert_eq!(address_mode(AddressMode::ClampToEdge), wgpu::AddressMode::ClampToEdge);
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
        assert_eq!(filter_mode(FilterMode::Linear), wgpu::FilterMode::Linear);
    }

    // ── frames (offscreen device) ─────────────────────────────────────────

    #[test]
    fn driver_frames_draw_and_reuse_one_bind_group() {
        let Some(mut backend) = headless() else { return };
        let sources = ShaderSources::from_text(VS, FS);
        let mut driver =
            FrameDriver::with_sources(&mut backend, &config(ShaderPolicy::Strict), &sources)
                .unwrap();

        for _ in 0..3 {
            assert!(matches!(driver.render_frame(&mut backend, input()), FrameOutcome::Presented));
        }
        assert_eq!(backend.counters.frames, 3);
        assert_eq!(backend.counters.draws, 3);
        assert_eq!(backend.counters.bind_groups, 1);
        // The draw pass consumed the clear each time.
        assert_eq!(backend.counters.clear_passes, 0);

        driver.shutdown(&mut backend);
        assert_eq!(backend.programs.len() + backend.geometries.len() + backend.volumes.len(), 0);
    }

    #[test]
    fn switching_volumes_rebuilds_the_bind_group() {
        let Some(mut backend) = headless() else { return };
        let sources = ShaderSources::from_text(VS, FS);
        let program = ProgramBuilder::new(ShaderPolicy::Strict)
            .build(&mut backend, &sources, &QuadMesh::LAYOUT)
            .unwrap();
        let quad = ScreenQuad::upload(&mut backend, &QuadMesh::screen());
        let a = VolumeTexture::upload(&mut backend, &VoxelGrid::occupied(GridExtent::cube(2)))
            .unwrap();
        let b = VolumeTexture::upload(&mut backend, &VoxelGrid::filled(GridExtent::cube(3), 0))
            .unwrap();

        for volume in [a.handle(), b.handle(), b.handle(), a.handle()] {
            assert_eq!(backend.begin_frame(), FrameStatus::Ready);
            backend.clear(Color::BLACK);
            backend.use_program(program);
            backend.write_uniforms(&FrameUniforms::new(&input(), VOLUME_UNIT));
            backend.bind_volume(VOLUME_UNIT, volume);
            backend.draw_indexed(quad.handle(), quad.index_count());
            backend.present();
        }
        assert_eq!(backend.counters.draws, 4);
        assert_eq!(backend.counters.bind_groups, 3);

        a.release(&mut backend);
        b.release(&mut backend);
        quad.release(&mut backend);
        backend.release_program(program);
    }

    #[test]
    fn frame_without_draw_still_clears() {
        let Some(mut backend) = headless() else { return };
        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.clear(Color::rgba(0.2, 0.3, 0.4, 1.0));
        backend.present();

        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.present();

        assert_eq!(backend.counters.frames, 2);
        assert_eq!(backend.counters.clear_passes, 1);
        assert_eq!(backend.counters.draws, 0);
    }

    #[test]
    fn lenient_unlinked_program_only_clears() {
        let Some(mut backend) = headless() else { return };
        let sources = ShaderSources::from_text(VS, FS_UNLINKABLE);
        let mut driver =
            FrameDriver::with_sources(&mut backend, &config(ShaderPolicy::Lenient), &sources)
                .unwrap();

        for _ in 0..2 {
            assert!(matches!(driver.render_frame(&mut backend, input()), FrameOutcome::Presented));
        }
        assert!(backend.warned_unlinked_draw);
        assert_eq!(backend.counters.draws, 0);
        assert_eq!(backend.counters.clear_passes, 2);
        assert_eq!(backend.counters.bind_groups, 0);

        driver.shutdown(&mut backend);
    }

    #[test]
    fn volume_on_another_unit_is_not_bound() {
        let Some(mut backend) = headless() else { return };
        let sources = ShaderSources::from_text(VS, FS);
        let program = ProgramBuilder::new(ShaderPolicy::Strict)
            .build(&mut backend, &sources, &QuadMesh::LAYOUT)
            .unwrap();
        let quad = ScreenQuad::upload(&mut backend, &QuadMesh::screen());
        let volume = VolumeTexture::upload(&mut backend, &VoxelGrid::occupied(GridExtent::cube(2)))
            .unwrap();

        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.clear(Color::BLACK);
        backend.use_program(program);
        backend.bind_volume(3, volume.handle());
        backend.draw_indexed(quad.handle(), quad.index_count());
        backend.present();

        assert_eq!(backend.counters.draws, 0);
        assert_eq!(backend.counters.clear_passes, 1);

        volume.release(&mut backend);
        quad.release(&mut backend);
        backend.release_program(program);
    }

    #[test]
    fn zero_sized_target_skips_until_resized() {
        let Some(mut backend) = headless() else { return };
        backend.resize(0, 48);
        assert_eq!(backend.begin_frame(), FrameStatus::Skip);
        backend.resize(32, 32);
        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.present();
        assert_eq!(backend.counters.frames, 1);
    }

    // ── interface mismatches never reach pipeline creation ────────────────

    fn build_strict(backend: &mut WgpuBackend<'_>, vs: &str, fs: &str) -> ProgramError {
        let err = ProgramBuilder::new(ShaderPolicy::Strict)
            .build(backend, &ShaderSources::from_text(vs, fs), &QuadMesh::LAYOUT)
            .unwrap_err();
        assert_eq!(backend.programs.len(), 0);
        assert_eq!(backend.stages.len(), 0);
        err
    }

    #[test]
    fn mismatched_interfaces_fail_to_link_without_device_errors() {
        let Some(mut backend) = headless() else { return };

        let uint_input = r#"
            @vertex fn vs_main(@location(0) p: vec2<u32>) -> @builtin(position) vec4<f32> {
                return vec4<f32>(vec2<f32>(p), 0.0, 1.0);
            }
        "#;
        let solid = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let err = build_strict(&mut backend, uint_input, solid);
        assert!(matches!(err, ProgramError::Link { .. }), "{err}");

        let scalar_out = r#"
            struct Out {
                @builtin(position) pos: vec4<f32>,
                @location(0) v: f32,
            };
            @vertex fn vs_main(@location(0) p: vec2<f32>) -> Out {
                var o: Out;
                o.pos = vec4<f32>(p, 0.0, 1.0);
                o.v = p.x;
                return o;
            }
        "#;
        let uint_in = r#"
            @fragment
            fn fs_main(@location(0) @interpolate(flat) c: vec4<u32>) -> @location(0) vec4<f32> {
                return vec4<f32>(c);
            }
        "#;
        let err = build_strict(&mut backend, scalar_out, uint_in);
        assert!(matches!(err, ProgramError::Link { .. }), "{err}");

        let int_color = "@fragment fn fs_main() -> @location(0) vec4<i32> { return vec4<i32>(1); }";
        let err = build_strict(&mut backend, VS, int_color);
        assert!(matches!(err, ProgramError::Link { .. }), "{err}");

        let vertex_reads_volume = r#"
            @group(0) @binding(1) var volume: texture_3d<u32>;
            @vertex fn vs_main(@location(0) p: vec2<f32>) -> @builtin(position) vec4<f32> {
                let c = f32(textureLoad(volume, vec3<i32>(0), 0).r);
                return vec4<f32>(p, c, 1.0);
            }
        "#;
        let err = build_strict(&mut backend, vertex_reads_volume, solid);
        assert!(matches!(err, ProgramError::Compile { .. }), "{err}");
    }
}
