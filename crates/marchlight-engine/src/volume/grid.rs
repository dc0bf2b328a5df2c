use std::fmt;

use super::VolumeError;

/// Grid size in cells.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GridExtent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl GridExtent {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub const fn cube(n: u32) -> Self {
        Self::new(n, n, n)
    }

    pub const fn cell_count(self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    pub const fn as_array(self) -> [u32; 3] {
        [self.width, self.height, self.depth]
    }
}

impl Default for GridExtent {
    fn default() -> Self {
        Self::cube(32)
    }
}

impl fmt::Display for GridExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Axis-aligned box of cells: `origin .. origin + size` on each axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GridRegion {
    pub origin: [u32; 3],
    pub size: [u32; 3],
}

impl GridRegion {
    pub const fn new(origin: [u32; 3], size: [u32; 3]) -> Self {
        Self { origin, size }
    }

    pub const fn whole(extent: GridExtent) -> Self {
        Self::new([0; 3], extent.as_array())
    }

    pub fn is_empty(&self) -> bool {
        self.size.contains(&0)
    }

    pub fn fits(&self, extent: GridExtent) -> bool {
        let max = extent.as_array();
        (0..3).all(|a| {
            self.origin[a]
                .checked_add(self.size[a])
                .is_some_and(|end| end <= max[a])
        })
    }

    pub fn cell_count(&self) -> usize {
        self.size.iter().map(|s| *s as usize).product()
    }
}

/// Dense 3-D array of `u32` cells, x varies fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    extent: GridExtent,
    cells: Vec<u32>,
}

impl VoxelGrid {
    pub const EMPTY: u32 = 0;
    pub const OCCUPIED: u32 = 1;

    pub fn filled(extent: GridExtent, value: u32) -> Self {
        Self {
            extent,
            cells: vec![value; extent.cell_count()],
        }
    }

    /// Every cell set to [`Self::OCCUPIED`].
    pub fn occupied(extent: GridExtent) -> Self {
        Self::filled(extent, Self::OCCUPIED)
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.cells)
    }

    /// Linear index of `(x, y, z)`, or `None` outside the extent.
    pub fn index(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        let GridExtent { width, height, depth } = self.extent;
        if x >= width || y >= height || z >= depth {
            return None;
        }
        Some((z as usize * height as usize + y as usize) * width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<u32> {
        self.index(x, y, z).map(|i| self.cells[i])
    }

    /// Writes one cell; returns `false` (and writes nothing) outside the extent.
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: u32) -> bool {
        match self.index(x, y, z) {
            Some(i) => {
                self.cells[i] = value;
                true
            }
            None => false,
        }
    }

    /// Row-packed texel bytes of `region`, ready for a texture write.
    pub fn region_bytes(&self, region: GridRegion) -> Result<Vec<u8>, VolumeError> {
        if !region.fits(self.extent) {
            return Err(VolumeError::RegionOutOfBounds {
                region,
                extent: self.extent,
            });
        }

        let [ox, oy, oz] = region.origin;
        let [sx, sy, sz] = region.size;
        let mut out = Vec::with_capacity(region.cell_count() * 4);
        for z in oz..oz + sz {
            for y in oy..oy + sy {
                let Some(start) = self.index(ox, y, z) else { continue };
                let row = &self.cells[start..start + sx as usize];
                out.extend_from_slice(bytemuck::cast_slice(row));
            }
        }
        Ok(out)
    }
}
