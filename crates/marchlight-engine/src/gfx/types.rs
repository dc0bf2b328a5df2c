//! Backend-neutral resource descriptions.

/// Linear straight-alpha RGBA used for the framebuffer clear.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Clamps all channels to [0, 1].
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AttributeFormat {
    Float32x2,
}

impl AttributeFormat {
    pub const fn size(self) -> u64 {
        match self {
            AttributeFormat::Float32x2 => 8,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: AttributeFormat,
    pub offset: u64,
}

/// How raw vertex bytes map to shader inputs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexLayout {
    pub array_stride: u64,
    pub attributes: &'static [VertexAttribute],
}

/// Texel format of a volume texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TexelFormat {
    /// One unsigned 32-bit integer channel: a voxel cell value.
    R32Uint,
}

impl TexelFormat {
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            TexelFormat::R32Uint => 4,
        }
    }

    pub const fn is_filterable(self) -> bool {
        match self {
            TexelFormat::R32Uint => false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressMode {
    ClampToEdge,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Requested sampling state for a volume texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SamplerDesc {
    pub address_mode: [AddressMode; 3],
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerDesc {
    /// Clamp-to-edge on u/v/w, linear min/mag.
    pub const CLAMP_LINEAR: Self = Self {
        address_mode: [AddressMode::ClampToEdge; 3],
        min_filter: FilterMode::Linear,
        mag_filter: FilterMode::Linear,
    };

    /// Returns the sampler state a GPU can actually honor for `format`.
    ///
    /// Integer texels are not filterable; linear filters collapse to nearest.
    pub fn effective_for(self, format: TexelFormat) -> Self {
        if format.is_filterable() {
            return self;
        }
        Self {
            min_filter: FilterMode::Nearest,
            mag_filter: FilterMode::Nearest,
            ..self
        }
    }
}

/// Shape and sampling of a 3-D texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VolumeDesc {
    pub extent: [u32; 3],
    pub format: TexelFormat,
    pub sampler: SamplerDesc,
}

impl VolumeDesc {
    pub fn byte_len(&self) -> usize {
        let [w, h, d] = self.extent;
        w as usize * h as usize * d as usize * self.format.bytes_per_texel() as usize
    }
}

/// Outcome of acquiring the next frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    /// A surface image is ready; record and present.
    Ready,
    /// Transient failure; skip this iteration.
    Skip,
    /// Unrecoverable failure; stop rendering.
    Fatal,
}
