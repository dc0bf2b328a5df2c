use crate::gfx::{RenderBackend, SamplerDesc, TexelFormat, VolumeDesc, VolumeHandle};

use super::{GridRegion, VolumeError, VoxelGrid};

/// GPU mirror of a [`VoxelGrid`]: one 3-D `R32Uint` texture.
///
/// Sampling requests clamp-to-edge on all three axes and linear min/mag
/// filtering; backends downgrade the filter where integer texels cannot be
/// filtered.
#[derive(Debug)]
pub struct VolumeTexture {
    handle: VolumeHandle,
    desc: VolumeDesc,
}

impl VolumeTexture {
    pub const FORMAT: TexelFormat = TexelFormat::R32Uint;
    /// wgpu's default `max_texture_dimension_3d`.
    pub const MAX_EDGE: u32 = 2048;

    /// Allocates the texture and uploads every cell in one write.
    pub fn upload<B>(backend: &mut B, grid: &VoxelGrid) -> Result<Self, VolumeError>
    where
        B: RenderBackend + ?Sized,
    {
        let extent = grid.extent();
        if extent.as_array().iter().any(|&e| e == 0 || e > Self::MAX_EDGE) {
            return Err(VolumeError::UnsupportedExtent { extent, max_edge: Self::MAX_EDGE });
        }

        let desc = VolumeDesc {
            extent: extent.as_array(),
            format: Self::FORMAT,
            sampler: SamplerDesc::CLAMP_LINEAR,
        };

        let handle = backend.create_volume(&desc);
        let texture = Self { handle, desc };

        if let Err(e) = texture.update_all(backend, grid) {
            texture.release(backend);
            return Err(e);
        }

        log::info!("volume texture uploaded ({extent} cells)");
        Ok(texture)
    }

    /// Re-uploads the whole grid.
    pub fn update_all<B>(&self, backend: &mut B, grid: &VoxelGrid) -> Result<(), VolumeError>
    where
        B: RenderBackend + ?Sized,
    {
        self.update(backend, grid, GridRegion::whole(grid.extent()))
    }

    /// Re-uploads the cells inside `region`.
    ///
    /// `grid` must have the extent the texture was created with.
    pub fn update<B>(
        &self,
        backend: &mut B,
        grid: &VoxelGrid,
        region: GridRegion,
    ) -> Result<(), VolumeError>
    where
        B: RenderBackend + ?Sized,
    {
        if grid.extent().as_array() != self.desc.extent {
            return Err(VolumeError::Upload {
                message: format!(
                    "grid extent {} does not match texture extent {:?}",
                    grid.extent(),
                    self.desc.extent
                ),
            });
        }
        if region.is_empty() {
            return Ok(());
        }

        let texels = grid.region_bytes(region)?;
        backend
            .write_volume(self.handle, region.origin, region.size, &texels)
            .map_err(|e| VolumeError::Upload {
                message: format!("{e:#}"),
            })
    }

    pub fn handle(&self) -> VolumeHandle {
        self.handle
    }

    pub fn desc(&self) -> &VolumeDesc {
        &self.desc
    }

    pub fn release<B>(self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        backend.release_volume(self.handle);
    }
}
