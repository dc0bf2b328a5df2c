//! Screen-filling geometry.

mod quad;

pub use quad::{QuadMesh, QuadVertex, ScreenQuad};
