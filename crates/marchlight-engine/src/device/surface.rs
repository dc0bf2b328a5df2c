//! Swapchain policy: format and alpha choice, resize, and the response to
//! acquisition failures.

use winit::dpi::PhysicalSize;

use super::SurfaceErrorAction;

/// Picks the swapchain format the ray-march pass renders into.
///
/// With `prefer_srgb` the first sRGB format the surface lists wins, so linear
/// shader output is gamma-encoded on store. Otherwise, or if none is listed,
/// the surface's preferred (first) format is used.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let srgb = if prefer_srgb {
        caps.formats.iter().copied().find(|f| f.is_srgb())
    } else {
        None
    };
    srgb.or_else(|| caps.formats.first().copied())
}

/// Requested alpha mode if supported, else the surface's first, else `Auto`.
pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Records the new drawable size and reconfigures the surface.
///
/// A minimized window reports 0x0, which wgpu cannot configure. The size is
/// still recorded so frames are skipped, and the old configuration stays
/// until the window has an area again.
pub(crate) fn apply_resize(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &mut wgpu::SurfaceConfiguration,
    size: &mut PhysicalSize<u32>,
    new_size: PhysicalSize<u32>,
) {
    *size = new_size;
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    config.width = new_size.width;
    config.height = new_size.height;
    surface.configure(device, config);
}

/// What the frame loop does about a failed acquire.
pub(crate) fn classify_surface_error(err: &wgpu::SurfaceError) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Classifies `err` and, for a lost or outdated swapchain, reconfigures it
/// at the last non-zero size. The current frame is skipped either way.
pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    let action = classify_surface_error(&err);
    if action == SurfaceErrorAction::Reconfigured && size.width > 0 && size.height > 0 {
        surface.configure(device, config);
    }
    action
}
