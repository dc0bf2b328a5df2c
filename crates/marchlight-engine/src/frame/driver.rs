use crate::error::StartupError;
use crate::geometry::{QuadMesh, ScreenQuad};
use crate::gfx::{Color, FrameStatus, ProgramHandle, RenderBackend};
use crate::shader::{ProgramBuilder, ShaderSources};
use crate::volume::{VolumeTexture, VoxelGrid};

use super::{FrameInput, FrameUniforms, PipelineConfig};

/// Texture unit the volume is bound to. The same value is written into
/// `FrameUniforms::volume_unit`.
pub const VOLUME_UNIT: u32 = 0;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverState {
    Running,
    Terminating,
}

/// Result of one `render_frame` call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    Presented,
    /// Surface not ready; nothing was drawn.
    Skipped,
    /// The driver is terminating; nothing was drawn.
    Stopped,
}

/// Window side of a self-pumped render loop.
pub trait FrameHost {
    fn should_close(&self) -> bool;

    /// Framebuffer size, raw cursor and elapsed time for the next frame.
    fn frame_input(&mut self) -> FrameInput;

    /// Processes pending window/input events.
    fn poll_events(&mut self);
}

/// Owns the program, quad and volume for the lifetime of the window and
/// drives the per-frame protocol.
///
/// Resources are released by [`shutdown`](Self::shutdown), in the order
/// geometry, volume, program.
#[derive(Debug)]
pub struct FrameDriver {
    state: DriverState,
    clear_color: Color,

    program: Option<ProgramHandle>,
    quad: Option<ScreenQuad>,
    volume: Option<VolumeTexture>,
    grid: VoxelGrid,

    frames_presented: u64,
}

impl FrameDriver {
    /// Reads the shader files named by `config` and builds the pipeline.
    pub fn new<B>(backend: &mut B, config: &PipelineConfig) -> Result<Self, StartupError>
    where
        B: RenderBackend + ?Sized,
    {
        let sources = ShaderSources::load(&config.shaders, config.policy)?;
        Self::with_sources(backend, config, &sources)
    }

    /// Builds program, quad and volume in that order.
    ///
    /// On failure everything created so far is released before returning.
    pub fn with_sources<B>(
        backend: &mut B,
        config: &PipelineConfig,
        sources: &ShaderSources,
    ) -> Result<Self, StartupError>
    where
        B: RenderBackend + ?Sized,
    {
        let program = ProgramBuilder::new(config.policy).build(backend, sources, &QuadMesh::LAYOUT)?;

        let quad = ScreenQuad::upload(backend, &QuadMesh::screen());

        let grid = VoxelGrid::occupied(config.grid_extent);
        let volume = match VolumeTexture::upload(backend, &grid) {
            Ok(v) => v,
            Err(e) => {
                quad.release(backend);
                backend.release_program(program);
                return Err(e.into());
            }
        };

        log::info!("render pipeline ready");

        Ok(Self {
            state: DriverState::Running,
            clear_color: config.clear_color.clamped(),
            program: Some(program),
            quad: Some(quad),
            volume: Some(volume),
            grid,
            frames_presented: 0,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// CPU copy of the volume. Mutations reach the GPU only through
    /// [`upload_grid`](Self::upload_grid).
    pub fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    /// Re-uploads the whole CPU grid to the volume texture.
    pub fn upload_grid<B>(&mut self, backend: &mut B) -> Result<(), crate::volume::VolumeError>
    where
        B: RenderBackend + ?Sized,
    {
        match &self.volume {
            Some(v) => v.update_all(backend, &self.grid),
            None => Ok(()),
        }
    }

    /// Framebuffer resize notification.
    pub fn resize<B>(&mut self, backend: &mut B, width: u32, height: u32)
    where
        B: RenderBackend + ?Sized,
    {
        log::debug!("framebuffer resized to {width}x{height}");
        backend.resize(width, height);
    }

    /// Close request from the window; the next frame is not drawn.
    pub fn request_close(&mut self) {
        if self.state == DriverState::Running {
            log::info!("close requested after {} frames", self.frames_presented);
        }
        self.state = DriverState::Terminating;
    }

    /// Renders and presents one frame.
    pub fn render_frame<B>(&mut self, backend: &mut B, input: FrameInput) -> FrameOutcome
    where
        B: RenderBackend + ?Sized,
    {
        if self.state != DriverState::Running {
            return FrameOutcome::Stopped;
        }
        let (Some(program), Some(quad), Some(volume)) = (self.program, &self.quad, &self.volume)
        else {
            return FrameOutcome::Stopped;
        };

        match backend.begin_frame() {
            FrameStatus::Ready => {}
            FrameStatus::Skip => return FrameOutcome::Skipped,
            FrameStatus::Fatal => {
                log::error!("surface lost beyond recovery; terminating");
                self.state = DriverState::Terminating;
                return FrameOutcome::Stopped;
            }
        }

        backend.clear(self.clear_color);
        backend.use_program(program);

        let uniforms = FrameUniforms::new(&input, VOLUME_UNIT);
        backend.write_uniforms(&uniforms);
        backend.bind_volume(VOLUME_UNIT, volume.handle());

        backend.draw_indexed(quad.handle(), quad.index_count());
        backend.present();

        self.frames_presented += 1;
        log::trace!(
            "frame {} t={:.3} res={:?} mouse={:?}",
            self.frames_presented,
            uniforms.time,
            uniforms.resolution,
            uniforms.mouse
        );

        FrameOutcome::Presented
    }

    /// Polls `host` until it asks to close, then shuts down.
    pub fn run<B, H>(&mut self, backend: &mut B, host: &mut H)
    where
        B: RenderBackend + ?Sized,
        H: FrameHost + ?Sized,
    {
        loop {
            if host.should_close() {
                self.request_close();
            }
            if self.state != DriverState::Running {
                break;
            }

            let input = host.frame_input();
            self.render_frame(backend, input);
            host.poll_events();
        }

        self.shutdown(backend);
    }

    /// Releases geometry, volume and program. Calling it again does nothing.
    pub fn shutdown<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        self.state = DriverState::Terminating;

        let held = self.quad.is_some() || self.volume.is_some() || self.program.is_some();
        if let Some(quad) = self.quad.take() {
            quad.release(backend);
        }
        if let Some(volume) = self.volume.take() {
            volume.release(backend);
        }
        if let Some(program) = self.program.take() {
            backend.release_program(program);
        }
        if held {
            log::info!("pipeline resources released");
        }
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        if self.program.is_some() || self.quad.is_some() || self.volume.is_some() {
            log::warn!("FrameDriver dropped without shutdown; GPU resources leaked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::gfx::recording::{Call, RecordingBackend};
    use crate::shader::{ShaderPaths, ShaderPolicy, ShaderStage};
    use crate::volume::GridExtent;

    fn config() -> PipelineConfig {
        PipelineConfig {
            grid_extent: GridExtent::cube(4),
            ..PipelineConfig::default()
        }
    }

    fn sources() -> ShaderSources {
        ShaderSources::from_text("vs", "fs")
    }

    fn input() -> FrameInput {
        FrameInput {
            framebuffer: (640, 480),
            cursor: (100.0, 50.0),
            elapsed: 0.25,
        }
    }

    fn started() -> (RecordingBackend, FrameDriver) {
        let mut backend = RecordingBackend::default();
        let driver = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap();
        backend.clear_calls();
        (backend, driver)
    }

    fn uniforms_of(backend: &RecordingBackend) -> Vec<FrameUniforms> {
        backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteUniforms(u) => Some(*u),
                _ => None,
            })
            .collect()
    }

    /// Test host closing after `frames` iterations.
    struct ScriptedHost {
        frames: u32,
        polled: u32,
    }

    impl FrameHost for ScriptedHost {
        fn should_close(&self) -> bool {
            self.polled >= self.frames
        }

        fn frame_input(&mut self) -> FrameInput {
            FrameInput {
                elapsed: self.polled as f32 / 60.0,
                ..input()
            }
        }

        fn poll_events(&mut self) {
            self.polled += 1;
        }
    }

    // ── startup ───────────────────────────────────────────────────────────

    #[test]
    fn startup_builds_program_quad_volume_in_order() {
        let mut backend = RecordingBackend::default();
        let mut driver = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap();

        let creates: Vec<&str> = backend
            .calls
            .iter()
            .map(Call::kind)
            .filter(|k| matches!(*k, "link_program" | "create_geometry" | "create_volume"))
            .collect();
        assert_eq!(creates, ["link_program", "create_geometry", "create_volume"]);
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(backend.live_stages(), 0);

        driver.shutdown(&mut backend);
    }

    #[test]
    fn compile_failure_never_enters_the_loop() {
        let mut backend = RecordingBackend::default().failing_compile(ShaderStage::Fragment);
        let err = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap_err();

        assert!(matches!(err, StartupError::ShaderBuild(_)));
        assert_eq!(err.exit_code(), -1);
        assert_eq!(backend.count("begin_frame"), 0);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn volume_failure_releases_program_and_quad() {
        let mut backend = RecordingBackend::default().failing_volume_write();
        let err = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap_err();
        assert!(matches!(err, StartupError::VolumeUpload(_)));
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn zero_grid_extent_fails_startup_cleanly() {
        let mut backend = RecordingBackend::default();
        let cfg = PipelineConfig {
            grid_extent: GridExtent::new(16, 0, 16),
            ..config()
        };
        let err = FrameDriver::with_sources(&mut backend, &cfg, &sources()).unwrap_err();
        assert!(matches!(err, StartupError::VolumeUpload(_)));
        assert_eq!(err.exit_code(), -1);
        assert_eq!(backend.count("create_volume"), 0);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn missing_shader_file_is_fatal_under_strict_policy() {
        let dir = std::env::temp_dir().join(format!("marchlight-driver-{}", std::process::id()));
        let cfg = PipelineConfig {
            shaders: ShaderPaths::in_dir(dir.join("absent")),
            ..config()
        };
        let mut backend = RecordingBackend::default();
        let err = FrameDriver::new(&mut backend, &cfg).unwrap_err();
        assert!(matches!(err, StartupError::ShaderFileUnreadable(_)));
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn missing_shader_file_degrades_under_lenient_policy() {
        let dir = std::env::temp_dir().join(format!("marchlight-driver-l-{}", std::process::id()));
        let cfg = PipelineConfig {
            shaders: ShaderPaths::in_dir(dir.join("absent")),
            policy: ShaderPolicy::Lenient,
            ..config()
        };
        let mut backend = RecordingBackend::default().failing_link();
        let mut driver = FrameDriver::new(&mut backend, &cfg).unwrap();
        assert_eq!(driver.state(), DriverState::Running);
        driver.shutdown(&mut backend);
        assert_eq!(backend.live_total(), 0);
    }

    // ── frame protocol ────────────────────────────────────────────────────

    #[test]
    fn one_frame_is_one_clear_use_draw_present() {
        let (mut backend, mut driver) = started();

        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Presented);

        assert_eq!(backend.count("clear"), 1);
        assert_eq!(backend.count("use_program"), 1);
        assert_eq!(backend.count("draw_indexed"), 1);
        assert_eq!(backend.count("present"), 1);
        assert!(backend
            .calls
            .iter()
            .any(|c| matches!(c, Call::DrawIndexed { index_count: 6, .. })));

        let u = uniforms_of(&backend);
        assert_eq!(u.len(), 1);
        assert_eq!(u[0].resolution, [640.0, 480.0]);
        assert!(u[0].time >= 0.0);
        assert_eq!(u[0].mouse, [100.0, 50.0]);

        driver.shutdown(&mut backend);
    }

    #[test]
    fn frame_calls_follow_protocol_order() {
        let (mut backend, mut driver) = started();
        driver.render_frame(&mut backend, input());

        let kinds: Vec<&str> = backend.calls.iter().map(Call::kind).collect();
        assert_eq!(
            kinds,
            [
                "begin_frame",
                "clear",
                "use_program",
                "write_uniforms",
                "bind_volume",
                "draw_indexed",
                "present",
            ]
        );
        driver.shutdown(&mut backend);
    }

    #[test]
    fn sampler_uniform_matches_bound_unit() {
        let (mut backend, mut driver) = started();
        driver.render_frame(&mut backend, input());

        let bound = backend.calls.iter().find_map(|c| match c {
            Call::BindVolume { unit, .. } => Some(*unit),
            _ => None,
        });
        assert_eq!(bound, Some(VOLUME_UNIT));
        assert_eq!(uniforms_of(&backend)[0].volume_unit, VOLUME_UNIT);
        driver.shutdown(&mut backend);
    }

    #[test]
    fn cursor_outside_window_is_clamped() {
        let (mut backend, mut driver) = started();
        driver.render_frame(
            &mut backend,
            FrameInput {
                cursor: (-40.0, 9000.0),
                ..input()
            },
        );
        assert_eq!(uniforms_of(&backend)[0].mouse, [0.0, 480.0]);
        driver.shutdown(&mut backend);
    }

    #[test]
    fn skipped_surface_draws_nothing() {
        let mut backend = RecordingBackend::default().script_frames([FrameStatus::Skip]);
        let mut driver = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap();
        backend.clear_calls();

        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Skipped);
        assert_eq!(backend.count("draw_indexed"), 0);
        assert_eq!(driver.state(), DriverState::Running);

        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Presented);
        driver.shutdown(&mut backend);
    }

    #[test]
    fn fatal_surface_terminates() {
        let mut backend = RecordingBackend::default().script_frames([FrameStatus::Fatal]);
        let mut driver = FrameDriver::with_sources(&mut backend, &config(), &sources()).unwrap();

        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Stopped);
        assert_eq!(driver.state(), DriverState::Terminating);
        driver.shutdown(&mut backend);
    }

    #[test]
    fn closed_driver_does_not_draw() {
        let (mut backend, mut driver) = started();
        driver.request_close();
        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Stopped);
        assert!(backend.calls.is_empty());
        driver.shutdown(&mut backend);
    }

    #[test]
    fn resize_reaches_backend() {
        let (mut backend, mut driver) = started();
        driver.resize(&mut backend, 800, 600);
        assert_eq!(backend.calls, [Call::Resize(800, 600)]);
        driver.shutdown(&mut backend);
    }

    #[test]
    fn grid_reupload_writes_volume() {
        let (mut backend, mut driver) = started();
        driver.grid_mut().set(0, 0, 0, 0);
        driver.upload_grid(&mut backend).unwrap();
        assert_eq!(backend.count("write_volume"), 1);
        driver.shutdown(&mut backend);
    }

    // ── loop + teardown ───────────────────────────────────────────────────

    #[test]
    fn run_presents_until_close_then_releases() {
        let (mut backend, mut driver) = started();
        let mut host = ScriptedHost { frames: 3, polled: 0 };

        driver.run(&mut backend, &mut host);

        assert_eq!(backend.count("present"), 3);
        assert_eq!(driver.frames_presented(), 3);
        assert_eq!(driver.state(), DriverState::Terminating);
        assert_eq!(backend.live_total(), 0);

        let times: Vec<f32> = uniforms_of(&backend).iter().map(|u| u.time).collect();
        assert!(times.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn host_closed_before_first_frame_draws_nothing() {
        let (mut backend, mut driver) = started();
        let mut host = ScriptedHost { frames: 0, polled: 0 };
        driver.run(&mut backend, &mut host);
        assert_eq!(backend.count("begin_frame"), 0);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn shutdown_releases_geometry_volume_program_in_order() {
        let (mut backend, mut driver) = started();
        driver.shutdown(&mut backend);

        let kinds: Vec<&str> = backend.calls.iter().map(Call::kind).collect();
        assert_eq!(kinds, ["release_geometry", "release_volume", "release_program"]);
        assert_eq!(backend.live_total(), 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (mut backend, mut driver) = started();
        driver.shutdown(&mut backend);
        backend.clear_calls();
        driver.shutdown(&mut backend);
        assert!(backend.calls.is_empty());
        assert_eq!(driver.render_frame(&mut backend, input()), FrameOutcome::Stopped);
    }
}
