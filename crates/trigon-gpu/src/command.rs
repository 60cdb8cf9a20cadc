//! Command pool, command buffer and triangle recording.

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};

/// Clear color of the render pass: opaque red.
pub const CLEAR_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Vertices drawn per frame. They live in the vertex shader.
pub const TRIANGLE_VERTEX_COUNT: u32 = 3;

/// Create a command pool whose buffers can be reset individually.
///
/// # Safety
/// The device must be valid and the queue family must exist.
pub unsafe fn create_command_pool(device: &ash::Device, queue_family: u32) -> Result<vk::CommandPool> {
    let create_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family)
        .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

    unsafe { device.create_command_pool(&create_info, None) }.context("create command pool")
}

/// Allocate one primary command buffer.
///
/// The buffer is freed along with its pool.
///
/// # Safety
/// The device and pool must be valid.
pub unsafe fn allocate_command_buffer(
    device: &ash::Device,
    pool: vk::CommandPool,
) -> Result<vk::CommandBuffer> {
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
        .context("allocate command buffer")?;
    buffers
        .first()
        .copied()
        .ok_or_else(|| GpuError::Initialization("driver returned no command buffer".into()))
}

/// Viewport covering the whole extent, depth 0..1.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor covering the whole extent.
pub const fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

/// Handles needed to record one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameRecording {
    pub command_buffer: vk::CommandBuffer,
    pub framebuffer: vk::Framebuffer,
    pub render_pass: vk::RenderPass,
    pub pipeline: vk::Pipeline,
    pub extent: vk::Extent2D,
}

/// Record one render pass instance that clears to red and draws the triangle.
///
/// Re-recording overwrites the previous contents; the pool allows resets.
///
/// # Safety
/// Every handle must be valid and the buffer must not be pending execution.
pub unsafe fn record_frame(device: &ash::Device, frame: &FrameRecording) -> Result<()> {
    let cmd = frame.command_buffer;

    let begin_info = vk::CommandBufferBeginInfo::default();
    unsafe { device.begin_command_buffer(cmd, &begin_info) }
        .map_err(|e| GpuError::Initialization(format!("Failed to begin recording command buffer: {e}")))?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: CLEAR_COLOR,
        },
    }];
    let render_pass_info = vk::RenderPassBeginInfo::default()
        .render_pass(frame.render_pass)
        .framebuffer(frame.framebuffer)
        .render_area(full_scissor(frame.extent))
        .clear_values(&clear_values);

    unsafe {
        device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);
        device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, frame.pipeline);
        device.cmd_set_viewport(cmd, 0, &[full_viewport(frame.extent)]);
        device.cmd_set_scissor(cmd, 0, &[full_scissor(frame.extent)]);
        device.cmd_draw(cmd, TRIANGLE_VERTEX_COUNT, 1, 0, 0);
        device.cmd_end_render_pass(cmd);
    }

    unsafe { device.end_command_buffer(cmd) }
        .map_err(|e| GpuError::Initialization(format!("Failed to record command buffer: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn viewport_spans_extent() {
        let viewport = full_viewport(vk::Extent2D {
            width: 800,
            height: 600,
        });
        assert_relative_eq!(viewport.x, 0.0);
        assert_relative_eq!(viewport.y, 0.0);
        assert_relative_eq!(viewport.width, 800.0);
        assert_relative_eq!(viewport.height, 600.0);
        assert_relative_eq!(viewport.min_depth, 0.0);
        assert_relative_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn scissor_is_not_empty() {
        let extent = vk::Extent2D {
            width: 500,
            height: 500,
        };
        let scissor = full_scissor(extent);
        assert_eq!(scissor.offset, vk::Offset2D { x: 0, y: 0 });
        assert_eq!(scissor.extent, extent);
    }

    #[test]
    fn clears_to_opaque_red() {
        assert_eq!(CLEAR_COLOR, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(TRIANGLE_VERTEX_COUNT, 3);
    }
}
