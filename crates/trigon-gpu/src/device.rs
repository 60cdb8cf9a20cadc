//! Logical device and queue creation.

use std::ffi::{c_char, CStr};

use ash::vk;

use crate::error::{Result, VkResultExt};
use crate::physical_device::QueueFamilyIndices;

/// Priority given to every queue we create.
pub const QUEUE_PRIORITY: f32 = 1.0;

/// Graphics and present queue handles. They may be the same queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Queues {
    pub graphics: vk::Queue,
    pub present: vk::Queue,
}

/// One queue per distinct family.
pub fn queue_create_infos<'a>(
    families: &[u32],
    priority: &'a f32,
) -> Vec<vk::DeviceQueueCreateInfo<'a>> {
    families
        .iter()
        .map(|&family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(priority))
        })
        .collect()
}

/// Create the logical device with one queue per unique family and fetch both queues.
///
/// Layers are passed through for old loaders that still honour device layers.
///
/// # Safety
/// The instance and physical device must be valid, and `indices` must come
/// from that physical device.
pub unsafe fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    indices: &QueueFamilyIndices,
    extensions: &[&CStr],
    layers: &[&CStr],
) -> Result<(ash::Device, Queues)> {
    let (graphics_family, present_family) = indices.resolved()?;

    let priority = QUEUE_PRIORITY;
    let queue_infos = queue_create_infos(&indices.unique_families(), &priority);

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    // No optional features are needed for a single triangle.
    let features = vk::PhysicalDeviceFeatures::default();

    #[allow(deprecated)]
    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_infos)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .enabled_features(&features);

    let device = unsafe { instance.create_device(physical_device, &create_info, None) }
        .context("create logical device")?;

    let queues = unsafe {
        Queues {
            graphics: device.get_device_queue(graphics_family, 0),
            present: device.get_device_queue(present_family, 0),
        }
    };

    tracing::debug!(
        "Logical device created (graphics family {graphics_family}, present family {present_family})"
    );

    Ok((device, queues))
}
