use crate::gfx::Color;
use crate::shader::{ShaderPaths, ShaderPolicy};
use crate::volume::GridExtent;

/// Everything the pipeline needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub shaders: ShaderPaths,
    pub policy: ShaderPolicy,
    pub grid_extent: GridExtent,
    pub clear_color: Color,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shaders: ShaderPaths::in_dir("shaders"),
            policy: ShaderPolicy::Strict,
            grid_extent: GridExtent::default(),
            clear_color: Color::BLACK,
        }
    }
}
