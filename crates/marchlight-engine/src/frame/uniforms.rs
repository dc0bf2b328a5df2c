use bytemuck::{Pod, Zeroable};

use crate::input::clamp_cursor;

/// What the window collaborator reports for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameInput {
    /// Framebuffer size in physical pixels.
    pub framebuffer: (u32, u32),
    /// Raw cursor position in framebuffer pixels; may lie outside the window.
    pub cursor: (f64, f64),
    /// Seconds since start.
    pub elapsed: f32,
}

/// Uniform block written once per frame.
///
/// WGSL view:
/// ```text
/// struct Frame {
///     resolution: vec2<f32>,
///     mouse: vec2<f32>,
///     time: f32,
///     volume_unit: u32,
/// };
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub time: f32,
    /// Texture unit the volume is bound to this frame.
    pub volume_unit: u32,
    pub _pad: [u32; 2], // 16-byte uniform size
}

impl FrameUniforms {
    pub fn new(input: &FrameInput, volume_unit: u32) -> Self {
        let (w, h) = input.framebuffer;
        Self {
            resolution: [w as f32, h as f32],
            mouse: clamp_cursor(input.cursor, input.framebuffer),
            time: input.elapsed.max(0.0),
            volume_unit,
            _pad: [0; 2],
        }
    }
}
