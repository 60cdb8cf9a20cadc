//! GPU context: the whole resource chain from instance to command buffer.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use trigon_shaders::ShaderPaths;

use crate::command::{allocate_command_buffer, create_command_pool, record_frame, FrameRecording};
use crate::debug::{messenger_create_info, DebugMessenger};
use crate::device::{create_logical_device, Queues};
use crate::error::{GpuError, Result, VkResultExt};
use crate::extensions::{
    check_instance_extensions, join_names, query_instance_extensions, required_device_extensions,
    required_instance_extensions, validation_layers,
};
use crate::framebuffer::create_framebuffer;
use crate::instance::{create_instance, AppInfo};
use crate::lifecycle::{Lifecycle, Stage, Startup};
use crate::physical_device::{describe_device, pick_physical_device, DeviceProbe, QueueFamilyIndices};
use crate::pipeline::{create_graphics_pipeline, create_pipeline_layout, TrianglePipelineConfig};
use crate::release::ReleaseStack;
use crate::render_pass::create_render_pass;
use crate::surface::{create_surface, window_extensions};
use crate::swapchain::{create_image_view, create_swapchain, Swapchain, SwapchainPlan};

/// Everything startup needs, resolved once.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    pub app: AppInfo,
    pub validation: bool,
    pub shaders: ShaderPaths,
    /// Drawable size in pixels, used when the surface leaves the extent to us.
    pub window_size: (u32, u32),
    pub pipeline: TrianglePipelineConfig,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            app: AppInfo::default(),
            validation: cfg!(debug_assertions),
            shaders: ShaderPaths::default(),
            window_size: (500, 500),
            pipeline: TrianglePipelineConfig::default(),
        }
    }
}

/// Owns every GPU handle. Dropping it tears them down in reverse creation order.
pub struct GpuContext {
    releases: ReleaseStack,
    lifecycle: Lifecycle,

    device: ash::Device,
    physical_device: vk::PhysicalDevice,
    queue_families: QueueFamilyIndices,
    queues: Queues,
    swapchain: Swapchain,
    image_views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    framebuffers: Vec<vk::Framebuffer>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,

    // Declared last: the loader library must outlive every release above.
    _entry: ash::Entry,
}

impl GpuContext {
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub const fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub const fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub const fn queues(&self) -> Queues {
        self.queues
    }

    pub const fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    pub const fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub const fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub const fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    pub const fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub const fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    pub const fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    /// Record the triangle into the command buffer, targeting swapchain image `image_index`.
    pub fn record_frame(&self, image_index: usize) -> Result<()> {
        let framebuffer = *self.framebuffers.get(image_index).ok_or_else(|| {
            GpuError::Initialization(format!(
                "framebuffer {image_index} out of range ({} framebuffers)",
                self.framebuffers.len()
            ))
        })?;

        let frame = FrameRecording {
            command_buffer: self.command_buffer,
            framebuffer,
            render_pass: self.render_pass,
            pipeline: self.pipeline,
            extent: self.swapchain.extent,
        };
        unsafe { record_frame(&self.device, &frame) }
    }

    /// Enter the running state once startup work is done.
    pub fn start(&mut self) -> Result<()> {
        self.lifecycle.advance(Stage::Running)
    }

    /// Wait for the device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }.context("wait for device idle")
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        if let Err(e) = self.wait_idle() {
            tracing::warn!("{e}");
        }
        if self.lifecycle.stage() == Stage::Running {
            if let Err(e) = self.lifecycle.shut_down() {
                tracing::warn!("{e}");
            }
        } else {
            // Never reached Running, e.g. the first recording failed.
            self.lifecycle.fail();
        }
        self.releases.release_all();
        if let Err(e) = self.lifecycle.finish() {
            tracing::warn!("{e}");
        }
        tracing::info!("GPU context destroyed");
    }
}

/// Builder for creating a GPU context.
#[derive(Debug, Clone, Default)]
pub struct GpuContextBuilder {
    config: GpuConfig,
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GpuConfig) -> Self {
        Self { config }
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub const fn validation(mut self, enable: bool) -> Self {
        self.config.validation = enable;
        self
    }

    pub fn shaders(mut self, shaders: ShaderPaths) -> Self {
        self.config.shaders = shaders;
        self
    }

    pub const fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window_size = (width, height);
        self
    }

    pub const fn config(&self) -> &GpuConfig {
        &self.config
    }

    /// Build the GPU context for `window`.
    ///
    /// `lifecycle` must already be at [`Stage::WindowCreated`]. On error every
    /// handle created so far has been released, newest first.
    pub fn build<W>(self, window: &W, lifecycle: Lifecycle) -> Result<GpuContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let config = self.config;

        // Load Vulkan entry point
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;
        let mut startup = Startup::resume(lifecycle);

        // Instance
        let available = unsafe { query_instance_extensions(&entry) }?;
        tracing::debug!(
            "Available instance extensions: {}",
            join_names(available.iter().map(std::ffi::CString::as_c_str))
        );

        let window_exts = window_extensions(window)?;
        let extensions = required_instance_extensions(&window_exts, config.validation);
        check_instance_extensions(available.iter().map(std::ffi::CString::as_c_str), &extensions)?;
        let layers = if config.validation {
            validation_layers()
        } else {
            Vec::new()
        };
        let mut debug_info = messenger_create_info();

        let instance = startup.acquire("instance", || {
            let debug = config.validation.then_some(&mut debug_info);
            let instance =
                unsafe { create_instance(&entry, &config.app, &extensions, &layers, debug) }?;
            let handle = instance.clone();
            Ok((instance, move || unsafe { handle.destroy_instance(None) }))
        })?;
        startup.enter(Stage::InstanceReady)?;

        if config.validation {
            startup.acquire("debug messenger", || {
                let messenger = unsafe { DebugMessenger::new(&entry, &instance, &debug_info) }?;
                Ok(((), move || unsafe { messenger.destroy() }))
            })?;
            startup.enter(Stage::DebugMessengerReady)?;
        }

        // Surface
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let surface = startup.acquire("surface", || {
            let surface = unsafe { create_surface(&entry, &instance, window) }?;
            let loader = surface_loader.clone();
            Ok((surface, move || unsafe { loader.destroy_surface(surface, None) }))
        })?;
        startup.enter(Stage::SurfaceReady)?;

        // Physical device
        let device_extensions = required_device_extensions();
        let probe = DeviceProbe {
            instance: &instance,
            surface_loader: &surface_loader,
            surface,
            required_extensions: &device_extensions,
        };
        let candidates = unsafe { instance.enumerate_physical_devices() }
            .context("enumerate physical devices")?;
        tracing::debug!("Found {} GPU(s) with Vulkan support", candidates.len());

        let physical_device = pick_physical_device(&candidates, |candidate| {
            let suitability = unsafe { probe.probe(candidate) }?;
            let name = unsafe { describe_device(&instance, candidate) };
            if suitability.is_suitable() {
                tracing::info!("Selected GPU: {name}");
                Ok(true)
            } else {
                tracing::debug!(
                    "Skipping GPU {name}: {}",
                    suitability.rejection_reason().unwrap_or_default()
                );
                Ok(false)
            }
        })?;
        let suitability = unsafe { probe.probe(physical_device) }?;
        let queue_families = suitability.indices;
        startup.enter(Stage::PhysicalDeviceChosen)?;

        // Logical device
        let (device, queues) = startup.acquire("logical device", || {
            let (device, queues) = unsafe {
                create_logical_device(
                    &instance,
                    physical_device,
                    &queue_families,
                    &device_extensions,
                    &layers,
                )
            }?;
            let handle = device.clone();
            Ok(((device, queues), move || unsafe { handle.destroy_device(None) }))
        })?;
        startup.enter(Stage::DeviceReady)?;

        // Swapchain and image views
        let support = suitability.surface.ok_or_else(|| {
            GpuError::Initialization("surface support was not queried".into())
        })?;
        let plan = SwapchainPlan::negotiate(&support, config.window_size, &queue_families)?;
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        let swapchain = startup.acquire("swapchain", || {
            let swapchain = unsafe { create_swapchain(&swapchain_loader, surface, &plan) }?;
            let loader = swapchain_loader.clone();
            let handle = swapchain.handle;
            Ok((swapchain, move || unsafe { loader.destroy_swapchain(handle, None) }))
        })?;

        let mut image_views = Vec::with_capacity(swapchain.images.len());
        for (i, &image) in swapchain.images.iter().enumerate() {
            let view = startup.acquire(format!("image view {i}"), || {
                let view = unsafe { create_image_view(&device, image, swapchain.format) }?;
                let device = device.clone();
                Ok((view, move || unsafe { device.destroy_image_view(view, None) }))
            })?;
            image_views.push(view);
        }
        startup.enter(Stage::SwapchainReady)?;

        // Render pass and pipeline
        let render_pass = startup.acquire("render pass", || {
            let render_pass = unsafe { create_render_pass(&device, swapchain.format) }?;
            let device = device.clone();
            Ok((render_pass, move || unsafe {
                device.destroy_render_pass(render_pass, None);
            }))
        })?;
        startup.enter(Stage::RenderPassReady)?;

        let pipeline_layout = startup.acquire("pipeline layout", || {
            let layout = unsafe { create_pipeline_layout(&device) }?;
            let device = device.clone();
            Ok((layout, move || unsafe {
                device.destroy_pipeline_layout(layout, None);
            }))
        })?;
        let pipeline = startup.acquire("graphics pipeline", || {
            let pipeline = unsafe {
                create_graphics_pipeline(
                    &device,
                    &config.shaders,
                    &config.pipeline,
                    pipeline_layout,
                    render_pass,
                )
            }?;
            let device = device.clone();
            Ok((pipeline, move || unsafe { device.destroy_pipeline(pipeline, None) }))
        })?;
        startup.enter(Stage::PipelineReady)?;

        // Framebuffers
        let mut framebuffers = Vec::with_capacity(image_views.len());
        for (i, &view) in image_views.iter().enumerate() {
            let framebuffer = startup.acquire(format!("framebuffer {i}"), || {
                let framebuffer =
                    unsafe { create_framebuffer(&device, render_pass, view, swapchain.extent) }?;
                let device = device.clone();
                Ok((framebuffer, move || unsafe {
                    device.destroy_framebuffer(framebuffer, None);
                }))
            })?;
            framebuffers.push(framebuffer);
        }
        startup.enter(Stage::FramebuffersReady)?;

        // Commands
        let (graphics_family, _) = queue_families.resolved()?;
        let command_pool = startup.acquire("command pool", || {
            let pool = unsafe { create_command_pool(&device, graphics_family) }?;
            let device = device.clone();
            Ok((pool, move || unsafe { device.destroy_command_pool(pool, None) }))
        })?;
        startup.enter(Stage::CommandPoolReady)?;

        // Freed with the pool.
        let command_buffer = unsafe { allocate_command_buffer(&device, command_pool) }?;
        startup.enter(Stage::CommandBufferReady)?;

        tracing::debug!("GPU resources: {}", startup.acquired().join(", "));
        let (lifecycle, releases) = startup.finish();

        Ok(GpuContext {
            releases,
            lifecycle,
            device,
            physical_device,
            queue_families,
            queues,
            swapchain,
            image_views,
            render_pass,
            pipeline_layout,
            pipeline,
            framebuffers,
            command_pool,
            command_buffer,
            _entry: entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = GpuContextBuilder::new();
        let config = builder.config();
        assert_eq!(config.app.app_name, "Vulkan lab");
        assert_eq!(config.window_size, (500, 500));
        assert_eq!(config.validation, cfg!(debug_assertions));
        assert_eq!(config.shaders, ShaderPaths::default());
    }

    #[test]
    fn builder_overrides() {
        let builder = GpuContextBuilder::new()
            .app_name("triangle test")
            .validation(false)
            .window_size(640, 480)
            .shaders(ShaderPaths::in_dir("assets"));
        let config = builder.config();
        assert_eq!(config.app.app_name, "triangle test");
        assert!(!config.validation);
        assert_eq!(config.window_size, (640, 480));
        assert_eq!(config.shaders.vertex, std::path::Path::new("assets/vert.spv"));
    }
}
