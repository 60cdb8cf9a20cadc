//! Surface creation and capability queries.
//!
//! The surface itself comes from the windowing system through
//! raw-window-handle; this module only wraps the Vulkan side.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{GpuError, Result, VkResultExt};

/// Instance extensions the window's display needs for surface creation.
pub fn window_extensions<W>(window: &W) -> Result<Vec<&'static std::ffi::CStr>>
where
    W: HasDisplayHandle,
{
    let display = window
        .display_handle()
        .map_err(|e| GpuError::Initialization(format!("Failed to get display handle: {e}")))?;

    let names = ash_window::enumerate_required_extensions(display.as_raw())
        .context("enumerate window extensions")?;

    // SAFETY: ash-window returns pointers to static NUL-terminated names.
    Ok(names
        .iter()
        .map(|&name| unsafe { std::ffi::CStr::from_ptr(name) })
        .collect())
}

/// Create a surface bound to `window` and `instance`.
///
/// # Safety
/// The entry and instance must be valid and the window must outlive the surface.
pub unsafe fn create_surface<W>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<vk::SurfaceKHR>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let display = window
        .display_handle()
        .map_err(|e| GpuError::Initialization(format!("Failed to get display handle: {e}")))?;
    let window_handle = window
        .window_handle()
        .map_err(|e| GpuError::Initialization(format!("Failed to get window handle: {e}")))?;

    unsafe {
        ash_window::create_surface(
            entry,
            instance,
            display.as_raw(),
            window_handle.as_raw(),
            None,
        )
    }
    .context("create window surface")
}

/// What a physical device can do with a surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilities {
    /// Query surface capabilities for one device.
    ///
    /// # Safety
    /// The loader, physical device and surface must be valid.
    pub unsafe fn query(
        surface_loader: &ash::khr::surface::Instance,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .context("query surface capabilities")?;

            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .context("query surface formats")?;

            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .context("query present modes")?;

            Ok(Self {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// At least one format and one present mode.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adequacy_needs_formats_and_modes() {
        let mut caps = SurfaceCapabilities::default();
        assert!(!caps.is_adequate());

        caps.formats.push(vk::SurfaceFormatKHR::default());
        assert!(!caps.is_adequate());

        caps.present_modes.push(vk::PresentModeKHR::FIFO);
        assert!(caps.is_adequate());

        caps.formats.clear();
        assert!(!caps.is_adequate());
    }
}
