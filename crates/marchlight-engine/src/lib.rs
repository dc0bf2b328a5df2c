//! Ray-marched volume viewer engine.
//!
//! A full-screen quad is drawn every frame with a user-supplied WGSL program;
//! the fragment stage marches rays through a voxel grid uploaded as a 3-D
//! texture. Time, resolution and the cursor position reach the shader through
//! a small uniform block.

pub mod device;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gfx;
pub mod input;
pub mod logging;
pub mod shader;
pub mod time;
pub mod volume;
pub mod window;

pub use error::StartupError;
