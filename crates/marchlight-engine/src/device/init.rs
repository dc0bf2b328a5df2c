/// Window-surface parameters for the ray-march renderer.
///
/// The defaults suit a full-screen fragment shader that redraws every
/// vsync: FIFO pacing, an sRGB swapchain, and stock device limits (which
/// admit 3-D textures up to 2048 cells per edge).
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Take an sRGB swapchain format when the surface offers one. The
    /// fragment shader writes linear color and relies on the encode.
    pub prefer_srgb: bool,

    /// `Fifo` blocks in acquire until the next vblank, which makes it the
    /// frame loop's only pacing point. It is the one mode every surface
    /// supports.
    pub present_mode: wgpu::PresentMode,

    /// Falls back to the surface's first supported mode when unsupported.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Sampling an `R32Uint` volume with `textureLoad` needs no optional
    /// features, so this is normally empty.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Frames the CPU may queue ahead of the display. Two keeps the cursor
    /// and time uniforms close to what is on screen.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
