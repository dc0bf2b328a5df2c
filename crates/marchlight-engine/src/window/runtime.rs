use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::device::GpuInit;
use crate::error::StartupError;
use crate::frame::{FrameDriver, FrameInput, FrameOutcome, PipelineConfig};
use crate::gfx::WgpuBackend;
use crate::input::{InputEvent, PointerState};
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: PhysicalSize<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "marchlight".to_string(),
            initial_size: PhysicalSize::new(640, 480),
        }
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens the window, builds the pipeline and renders until the window
    /// is closed.
    ///
    /// Any failure before the first frame is returned as a [`StartupError`];
    /// the render loop is never entered in that case.
    pub fn run(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        pipeline: PipelineConfig,
    ) -> Result<(), StartupError> {
        let event_loop =
            EventLoop::new().map_err(|e| StartupError::WindowSystemInit(e.to_string()))?;
        let mut state = AppState::new(config, gpu_init, pipeline);

        event_loop.run_app(&mut state).map_err(|e| {
            StartupError::WindowSystemInit(format!("event loop terminated with error: {e}"))
        })?;

        match state.startup_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    pointer: PointerState,
    clock: FrameClock,
    driver: Option<FrameDriver>,

    window: Window,

    #[borrows(window)]
    #[covariant]
    backend: WgpuBackend<'this>,
}

impl WindowEntry {
    /// Releases pipeline resources while the window and device are alive.
    fn shutdown(&mut self) {
        self.with_mut(|fields| {
            if let Some(driver) = fields.driver.as_mut() {
                driver.request_close();
                driver.shutdown(fields.backend);
            }
        });
    }
}

struct AppState {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    pipeline: PipelineConfig,

    entry: Option<WindowEntry>,
    startup_error: Option<StartupError>,
    exit_requested: bool,
}

impl AppState {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, pipeline: PipelineConfig) -> Self {
        Self {
            config,
            gpu_init,
            pipeline,
            entry: None,
            startup_error: None,
            exit_requested: false,
        }
    }

    fn create_entry(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry, StartupError> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| StartupError::WindowCreation(e.to_string()))?;

        let gpu_init = self.gpu_init.clone();
        let mut entry = WindowEntryTryBuilder {
            pointer: PointerState::default(),
            clock: FrameClock::new(),
            driver: None,
            window,
            backend_builder: |w| pollster::block_on(WgpuBackend::new(w, gpu_init)),
        }
        .try_build()
        .map_err(|e| StartupError::ContextInit(format!("{e:#}")))?;

        let pipeline = &self.pipeline;
        let driver = entry.with_backend_mut(|backend| FrameDriver::new(backend, pipeline))?;
        entry.with_driver_mut(|slot| *slot = Some(driver));

        // Time starts with the first frame, not with pipeline construction.
        entry.with_clock_mut(|clock| clock.reset());

        Ok(entry)
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            entry.shutdown();
        }
        self.exit_requested = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        match self.create_entry(event_loop) {
            Ok(entry) => {
                log::info!("window `{}` ready", self.config.title);
                entry.with_window(|w| w.request_redraw());
                self.entry = Some(entry);
            }
            Err(e) => {
                log::error!("{e}");
                self.startup_error = Some(e);
                self.request_exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw; presentation paces the loop.
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };
        if entry.with_window(|w| w.id()) != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(size) => {
                entry.with_mut(|fields| {
                    if let Some(driver) = fields.driver.as_mut() {
                        driver.resize(fields.backend, size.width, size.height);
                    }
                    fields.window.request_redraw();
                });
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                entry.with_mut(|fields| {
                    let size = fields.window.inner_size();
                    if let Some(driver) = fields.driver.as_mut() {
                        driver.resize(fields.backend, size.width, size.height);
                    }
                    fields.window.request_redraw();
                });
            }

            WindowEvent::CursorMoved { position, .. } => {
                entry.with_pointer_mut(|p| {
                    p.apply_event(InputEvent::PointerMoved {
                        x: position.x,
                        y: position.y,
                    })
                });
            }

            WindowEvent::RedrawRequested => {
                let outcome = entry.with_mut(|fields| {
                    let Some(driver) = fields.driver.as_mut() else {
                        return FrameOutcome::Stopped;
                    };

                    let size = fields.window.inner_size();
                    let time = fields.clock.tick();
                    let input = FrameInput {
                        framebuffer: (size.width, size.height),
                        cursor: fields.pointer.raw_position(),
                        elapsed: time.elapsed,
                    };

                    log::trace!("frame {} at {:.3}s", time.frame_index, time.elapsed);
                    driver.render_frame(fields.backend, input)
                });

                if outcome == FrameOutcome::Stopped {
                    self.request_exit(event_loop);
                }
            }

            _ => {}
        }
    }
}
