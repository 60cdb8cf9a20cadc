//! Single-subpass render pass with one color attachment.

use ash::vk;

use crate::error::{Result, VkResultExt};

/// Color attachment: cleared on load, stored, handed to presentation.
pub fn color_attachment(format: vk::Format) -> vk::AttachmentDescription {
    vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
}

/// Reference to attachment 0 in color-optimal layout.
pub const COLOR_ATTACHMENT_REF: vk::AttachmentReference = vk::AttachmentReference {
    attachment: 0,
    layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
};

/// Create the render pass for a swapchain of `format`.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_render_pass(device: &ash::Device, format: vk::Format) -> Result<vk::RenderPass> {
    let attachments = [color_attachment(format)];
    let color_refs = [COLOR_ATTACHMENT_REF];

    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs);
    let subpasses = [subpass];

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses);

    unsafe { device.create_render_pass(&create_info, None) }.context("create render pass")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_clears_and_presents() {
        let attachment = color_attachment(vk::Format::R8G8B8A8_SRGB);
        assert_eq!(attachment.format, vk::Format::R8G8B8A8_SRGB);
        assert_eq!(attachment.samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(attachment.stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
        assert_eq!(attachment.stencil_store_op, vk::AttachmentStoreOp::DONT_CARE);
        assert_eq!(attachment.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(attachment.final_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn subpass_uses_first_attachment() {
        assert_eq!(COLOR_ATTACHMENT_REF.attachment, 0);
        assert_eq!(
            COLOR_ATTACHMENT_REF.layout,
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        );
    }
}
