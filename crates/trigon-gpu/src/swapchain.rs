//! Swapchain negotiation and creation.
//!
//! Every choice is made up front by [`SwapchainPlan::negotiate`], which only
//! looks at plain capability data. The swapchain is never recreated, so there
//! is no old-swapchain handling.

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};
use crate::physical_device::QueueFamilyIndices;
use crate::surface::SurfaceCapabilities;

/// Sentinel in `current_extent` meaning "size follows the window".
pub const EXTENT_FOLLOWS_WINDOW: u32 = u32::MAX;

/// Created swapchain and the images it owns.
///
/// Images are freed with the swapchain and never destroyed individually.
#[derive(Debug, Clone)]
pub struct Swapchain {
    pub handle: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

/// Select the best surface format.
///
/// Prefers 8-bit RGBA sRGB with the non-linear sRGB color space, otherwise the
/// first entry. `None` only for an empty list.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::R8G8B8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
}

/// Mailbox if offered, otherwise FIFO (always supported).
pub fn select_present_mode(available: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Calculate swapchain extent.
///
/// Uses the reported current extent unless it is the window-sized sentinel, in
/// which case the window's pixel size is clamped per axis into the surface bounds.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    window_width: u32,
    window_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != EXTENT_FOLLOWS_WINDOW {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    // max/min rather than clamp: a driver reporting min > max must not panic.
    vk::Extent2D {
        width: window_width.max(min.width).min(max.width),
        height: window_height.max(min.height).min(max.height),
    }
}

/// One more than the minimum, capped when the surface declares a maximum.
pub const fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count.saturating_add(1);
    if capabilities.max_image_count > 0 && count > capabilities.max_image_count {
        capabilities.max_image_count
    } else {
        count
    }
}

/// Concurrent across both families when they differ, exclusive otherwise.
pub fn image_sharing(graphics_family: u32, present_family: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics_family == present_family {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (
            vk::SharingMode::CONCURRENT,
            vec![graphics_family, present_family],
        )
    }
}

/// Every parameter of the swapchain, decided before any GPU call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapchainPlan {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing_mode: vk::SharingMode,
    pub queue_family_indices: Vec<u32>,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainPlan {
    /// Negotiate against the surface support of the chosen device.
    pub fn negotiate(
        support: &SurfaceCapabilities,
        window_size: (u32, u32),
        indices: &QueueFamilyIndices,
    ) -> Result<Self> {
        let surface_format = select_surface_format(&support.formats).ok_or_else(|| {
            GpuError::Initialization("surface reports no supported formats".into())
        })?;
        let (graphics, present) = indices.resolved()?;
        let (sharing_mode, queue_family_indices) = image_sharing(graphics, present);
        let caps = &support.capabilities;

        Ok(Self {
            surface_format,
            present_mode: select_present_mode(&support.present_modes),
            extent: calculate_extent(caps, window_size.0, window_size.1),
            image_count: choose_image_count(caps),
            sharing_mode,
            queue_family_indices,
            pre_transform: caps.current_transform,
        })
    }

    /// Descriptor for `vkCreateSwapchainKHR`. Borrows the family list from the plan.
    pub fn create_info(&self, surface: vk::SurfaceKHR) -> vk::SwapchainCreateInfoKHR<'_> {
        vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(self.image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(self.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(self.sharing_mode)
            .queue_family_indices(&self.queue_family_indices)
            .pre_transform(self.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null())
    }
}

/// Create the swapchain described by `plan` and fetch its images.
///
/// If fetching the images fails the new swapchain is destroyed before returning.
///
/// # Safety
/// The loader and surface must be valid.
pub unsafe fn create_swapchain(
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    plan: &SwapchainPlan,
) -> Result<Swapchain> {
    let create_info = plan.create_info(surface);
    let handle = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
        .context("create swapchain")?;

    let images = match unsafe { swapchain_loader.get_swapchain_images(handle) } {
        Ok(images) => images,
        Err(result) => {
            unsafe { swapchain_loader.destroy_swapchain(handle, None) };
            return Err(GpuError::Vulkan {
                context: "get swapchain images",
                result,
            });
        }
    };

    tracing::info!(
        "Swapchain created: {} images, {:?}, {}x{}, {:?}",
        images.len(),
        plan.surface_format.format,
        plan.extent.width,
        plan.extent.height,
        plan.present_mode
    );

    Ok(Swapchain {
        handle,
        images,
        format: plan.surface_format.format,
        extent: plan.extent,
    })
}

/// 2D color view over one swapchain image.
///
/// # Safety
/// The device and image must be valid.
pub unsafe fn create_image_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    unsafe { device.create_image_view(&view_info, None) }.context("create image view")
}
