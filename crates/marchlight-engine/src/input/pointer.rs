/// Platform-agnostic pointer events, in physical (framebuffer) pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved { x: f64, y: f64 },
}

/// Current pointer state for the window.
///
/// The last known position survives the cursor leaving the window, so the
/// shader keeps the value it last saw instead of snapping to the origin.
#[derive(Debug, Default, Clone)]
pub struct PointerState {
    /// Last reported cursor position, framebuffer pixels, top-left origin.
    pub position: Option<(f64, f64)>,
}

impl PointerState {
    pub fn apply_event(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::PointerMoved { x, y } => self.position = Some((x, y)),
        }
    }

    /// Raw position, or the origin if the cursor has never been seen.
    pub fn raw_position(&self) -> (f64, f64) {
        self.position.unwrap_or((0.0, 0.0))
    }
}

/// Clamps a raw cursor position into `[0, width] x [0, height]`.
///
/// Each axis is clamped independently. Non-finite coordinates map to 0 on
/// that axis; in-range values pass through unchanged.
pub fn clamp_cursor(raw: (f64, f64), framebuffer: (u32, u32)) -> [f32; 2] {
    fn axis(v: f64, max: u32) -> f32 {
        if v.is_nan() {
            return 0.0;
        }
        v.clamp(0.0, f64::from(max)) as f32
    }

    [axis(raw.0, framebuffer.0), axis(raw.1, framebuffer.1)]
}
