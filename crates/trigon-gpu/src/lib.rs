//! Vulkan setup for the Trigon triangle renderer.
//!
//! This crate provides:
//! - Extension and validation layer negotiation
//! - Instance, debug messenger and surface creation
//! - Physical device selection and logical device creation
//! - Swapchain negotiation, render pass, pipeline and framebuffers
//! - Command recording for a single hardcoded triangle
//! - Ordered teardown through a release stack and a one-way lifecycle

pub mod command;
pub mod context;
pub mod debug;
pub mod device;
pub mod error;
pub mod extensions;
pub mod framebuffer;
pub mod instance;
pub mod lifecycle;
pub mod physical_device;
pub mod pipeline;
pub mod release;
pub mod render_pass;
pub mod surface;
pub mod swapchain;

pub use command::{FrameRecording, CLEAR_COLOR};
pub use context::{GpuConfig, GpuContext, GpuContextBuilder};
pub use device::Queues;
pub use error::{ErrorKind, GpuError, Result};
pub use instance::AppInfo;
pub use lifecycle::{Lifecycle, Stage, Startup};
pub use physical_device::{DeviceSuitability, QueueFamilyIndices};
pub use pipeline::TrianglePipelineConfig;
pub use release::ReleaseStack;
pub use surface::SurfaceCapabilities;
pub use swapchain::{Swapchain, SwapchainPlan};
pub use trigon_shaders::ShaderPaths;
