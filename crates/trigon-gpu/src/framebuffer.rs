//! Framebuffers binding swapchain image views to the render pass.

use ash::vk;

use crate::error::{Result, VkResultExt};

/// Framebuffer descriptor for one image view.
pub fn framebuffer_info<'a>(
    render_pass: vk::RenderPass,
    attachments: &'a [vk::ImageView],
    extent: vk::Extent2D,
) -> vk::FramebufferCreateInfo<'a> {
    vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1)
}

/// Create the framebuffer for one swapchain image view.
///
/// Callers create one per view, in view order, and register each release on
/// its own so a failure part way through still tears down the earlier ones.
///
/// # Safety
/// The device, render pass and image view must be valid.
pub unsafe fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    image_view: vk::ImageView,
    extent: vk::Extent2D,
) -> Result<vk::Framebuffer> {
    let attachments = [image_view];
    let create_info = framebuffer_info(render_pass, &attachments, extent);
    unsafe { device.create_framebuffer(&create_info, None) }.context("create framebuffer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framebuffer_matches_extent_with_one_layer() {
        let views = [vk::ImageView::null()];
        let extent = vk::Extent2D {
            width: 500,
            height: 400,
        };
        let info = framebuffer_info(vk::RenderPass::null(), &views, extent);
        assert_eq!(info.attachment_count, 1);
        assert_eq!(info.width, 500);
        assert_eq!(info.height, 400);
        assert_eq!(info.layers, 1);
    }
}
