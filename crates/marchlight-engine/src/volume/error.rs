use std::fmt;

use super::{GridExtent, GridRegion};

#[derive(Debug, Clone, PartialEq)]
pub enum VolumeError {
    /// An edge is zero or larger than any device allows for a 3-D texture.
    UnsupportedExtent { extent: GridExtent, max_edge: u32 },
    /// The region does not lie inside the grid extent.
    RegionOutOfBounds { region: GridRegion, extent: GridExtent },
    /// The backend rejected the texel upload.
    Upload { message: String },
}

impl fmt::Display for VolumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeError::UnsupportedExtent { extent, max_edge } => write!(
                f,
                "grid extent {extent} cannot back a texture; every edge must be in 1..={max_edge}"
            ),
            VolumeError::RegionOutOfBounds { region, extent } => write!(
                f,
                "region {:?}+{:?} exceeds grid extent {}",
                region.origin, region.size, extent
            ),
            VolumeError::Upload { message } => write!(f, "volume upload failed: {message}"),
        }
    }
}

impl std::error::Error for VolumeError {}
