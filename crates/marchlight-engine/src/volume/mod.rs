//! Volumetric grid: CPU cell storage and its 3-D texture mirror.
//!
//! The grid is an owned value; the texture is written from it once at
//! startup and only re-written through the explicit `update*` calls.

mod error;
mod grid;
mod texture;

pub use error::VolumeError;
pub use grid::{GridExtent, GridRegion, VoxelGrid};
pub use texture::VolumeTexture;
