//! Triangle graphics pipeline.
//!
//! The pipeline has no vertex input. The three vertices are hardcoded in the
//! vertex shader, and viewport and scissor are dynamic state set at record time.

use std::ffi::CStr;

use ash::vk;
use trigon_shaders::{load_spirv, ShaderPaths};

use crate::error::{GpuError, Result, VkResultExt};

/// Entry point of both shader stages.
pub const SHADER_ENTRY: &CStr = c"main";

/// Fixed-function state of the triangle pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrianglePipelineConfig {
    pub topology: vk::PrimitiveTopology,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub line_width: f32,
}

impl Default for TrianglePipelineConfig {
    fn default() -> Self {
        Self {
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::CLOCKWISE,
            line_width: 1.0,
        }
    }
}

impl TrianglePipelineConfig {
    pub fn input_assembly(&self) -> vk::PipelineInputAssemblyStateCreateInfo<'static> {
        vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.topology)
            .primitive_restart_enable(false)
    }

    pub fn rasterization(&self) -> vk::PipelineRasterizationStateCreateInfo<'static> {
        vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(self.polygon_mode)
            .cull_mode(self.cull_mode)
            .front_face(self.front_face)
            .depth_bias_enable(false)
            .line_width(self.line_width)
    }
}

/// Viewport and scissor are supplied per recording.
pub const DYNAMIC_STATES: [vk::DynamicState; 2] =
    [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

/// No blending, all channels written.
pub fn color_blend_attachment() -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(false)
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

/// Shader module destroyed when dropped, whether or not the pipeline was created.
struct ShaderModule<'a> {
    device: &'a ash::Device,
    handle: vk::ShaderModule,
}

impl<'a> ShaderModule<'a> {
    unsafe fn new(device: &'a ash::Device, code: &[u32]) -> Result<Self> {
        let info = vk::ShaderModuleCreateInfo::default().code(code);
        let handle = unsafe { device.create_shader_module(&info, None) }
            .context("create shader module")?;
        Ok(Self { device, handle })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe { self.device.destroy_shader_module(self.handle, None) };
    }
}

/// Layout with no descriptor sets and no push constants.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_pipeline_layout(device: &ash::Device) -> Result<vk::PipelineLayout> {
    let layout_info = vk::PipelineLayoutCreateInfo::default();
    unsafe { device.create_pipeline_layout(&layout_info, None) }.context("create pipeline layout")
}

/// Load both shader binaries and build the graphics pipeline for `render_pass`.
///
/// Shader files are read before any GPU object is created, so a missing file
/// leaves nothing behind.
///
/// # Safety
/// The device, layout and render pass must be valid.
pub unsafe fn create_graphics_pipeline(
    device: &ash::Device,
    shaders: &ShaderPaths,
    config: &TrianglePipelineConfig,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
) -> Result<vk::Pipeline> {
    let vertex_code = load_spirv(&shaders.vertex)?;
    let fragment_code = load_spirv(&shaders.fragment)?;

    let vertex = unsafe { ShaderModule::new(device, &vertex_code) }?;
    let fragment = unsafe { ShaderModule::new(device, &fragment_code) }?;

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex.handle)
            .name(SHADER_ENTRY),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment.handle)
            .name(SHADER_ENTRY),
    ];

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
    let input_assembly = config.input_assembly();

    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);

    let rasterization = config.rasterization();

    let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1)
        .sample_shading_enable(false);

    let blend_attachments = [color_blend_attachment()];
    let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&blend_attachments);

    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&DYNAMIC_STATES);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
    }
    .map_err(|(_pipelines, result)| GpuError::Vulkan {
        context: "create graphics pipeline",
        result,
    })?;

    // Shader modules are dropped here, after the pipeline holds its own copy.
    pipelines.first().copied().ok_or_else(|| {
        GpuError::Initialization("driver returned no graphics pipeline".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fixed_function_state() {
        let config = TrianglePipelineConfig::default();

        let assembly = config.input_assembly();
        assert_eq!(assembly.topology, vk::PrimitiveTopology::TRIANGLE_LIST);
        assert_eq!(assembly.primitive_restart_enable, vk::FALSE);

        let raster = config.rasterization();
        assert_eq!(raster.polygon_mode, vk::PolygonMode::FILL);
        assert_eq!(raster.cull_mode, vk::CullModeFlags::BACK);
        assert_eq!(raster.front_face, vk::FrontFace::CLOCKWISE);
        assert_eq!(raster.depth_bias_enable, vk::FALSE);
        assert_eq!(raster.rasterizer_discard_enable, vk::FALSE);
        assert!((raster.line_width - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn viewport_and_scissor_are_dynamic() {
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::VIEWPORT));
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::SCISSOR));
    }

    #[test]
    fn blending_disabled_with_full_write_mask() {
        let blend = color_blend_attachment();
        assert_eq!(blend.blend_enable, vk::FALSE);
        assert_eq!(blend.color_write_mask, vk::ColorComponentFlags::RGBA);
    }

    #[test]
    fn shader_entry_point() {
        assert_eq!(SHADER_ENTRY.to_str().unwrap(), "main");
    }
}
