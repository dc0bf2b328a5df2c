use anyhow::{Context, Result};

/// Device plus a single color texture standing in for a window surface.
///
/// Frames render into the texture and are submitted without presenting.
/// Any adapter will do, including software rasterizers such as llvmpipe.
pub struct OffscreenTarget {
    _instance: wgpu::Instance,

    device: wgpu::Device,
    queue: wgpu::Queue,

    format: wgpu::TextureFormat,
    size: (u32, u32),

    /// `None` while the target is zero-sized.
    texture: Option<wgpu::Texture>,
}

impl OffscreenTarget {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub async fn new(width: u32, height: u32) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter for offscreen rendering")?;

        log::info!("offscreen adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("marchlight offscreen device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create offscreen device/queue")?;

        let mut target = Self {
            _instance: instance,
            device,
            queue,
            format: Self::FORMAT,
            size: (0, 0),
            texture: None,
        };
        target.resize(width, height);
        Ok(target)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Reallocates the color texture. A zero edge drops it until the next
    /// non-zero size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size == (width, height) && self.texture.is_some() {
            return;
        }
        self.size = (width, height);
        self.texture = (width > 0 && height > 0).then(|| {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("marchlight offscreen color"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        });
    }

    /// View of the color texture and a fresh encoder, or `None` while
    /// zero-sized.
    pub fn begin_frame(&self) -> Option<(wgpu::TextureView, wgpu::CommandEncoder)> {
        let texture = self.texture.as_ref()?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("marchlight offscreen encoder"),
            });
        Some((view, encoder))
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}
