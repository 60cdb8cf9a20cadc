//! Physical device selection.
//!
//! Candidates are taken in enumeration order and the first one that passes
//! every check wins. There is no ranking between multiple suitable GPUs.

use std::ffi::{CStr, CString};

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};
use crate::extensions::{
    extensions_supported, join_names, missing_names, query_device_extensions,
};
use crate::surface::SurfaceCapabilities;

/// Queue family indices for graphics and presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both families found.
    pub const fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Both indices, or an error naming the missing one.
    pub fn resolved(&self) -> Result<(u32, u32)> {
        match (self.graphics, self.present) {
            (Some(graphics), Some(present)) => Ok((graphics, present)),
            (None, _) => Err(GpuError::NoSuitableDevice(
                "no graphics-capable queue family".into(),
            )),
            (_, None) => Err(GpuError::NoSuitableDevice(
                "no queue family can present to the surface".into(),
            )),
        }
    }

    /// Distinct families to create queues for, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        for family in [self.graphics, self.present].into_iter().flatten() {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// Scan queue families in enumeration order.
///
/// Records the first graphics-capable family and, when `present_support` is
/// given, the first family that can present. Scanning stops as soon as every
/// requested index is known, so `present_support` is not queried past that point.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut present_support: Option<&mut dyn FnMut(u32) -> Result<bool>>,
) -> Result<QueueFamilyIndices> {
    let mut indices = QueueFamilyIndices::default();

    for (i, family) in families.iter().enumerate() {
        let i = i as u32;

        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(i);
        }

        if let Some(query) = present_support.as_deref_mut() {
            if indices.present.is_none() && query(i)? {
                indices.present = Some(i);
            }
        }

        let done = if present_support.is_some() {
            indices.is_complete()
        } else {
            indices.graphics.is_some()
        };
        if done {
            break;
        }
    }

    Ok(indices)
}

/// Result of checking one candidate against the renderer's needs.
#[derive(Debug, Clone, Default)]
pub struct DeviceSuitability {
    pub indices: QueueFamilyIndices,
    pub missing_extensions: Vec<CString>,
    /// Only queried when every required extension is present.
    pub surface: Option<SurfaceCapabilities>,
}

impl DeviceSuitability {
    pub fn is_suitable(&self) -> bool {
        self.indices.is_complete()
            && self.missing_extensions.is_empty()
            && self
                .surface
                .as_ref()
                .is_some_and(SurfaceCapabilities::is_adequate)
    }

    /// Human-readable reason a device was rejected.
    pub fn rejection_reason(&self) -> Option<String> {
        if self.indices.graphics.is_none() {
            Some("no graphics queue family".into())
        } else if self.indices.present.is_none() {
            Some("no present queue family".into())
        } else if !self.missing_extensions.is_empty() {
            Some(format!(
                "missing extensions: {}",
                join_names(self.missing_extensions.iter().map(CString::as_c_str))
            ))
        } else if !self.surface.as_ref().is_some_and(SurfaceCapabilities::is_adequate) {
            Some("no surface formats or present modes".into())
        } else {
            None
        }
    }
}

/// Required device extensions absent from `available`; empty when supported.
pub fn missing_device_extensions(available: &[CString], required: &[&CStr]) -> Vec<CString> {
    let names = || available.iter().map(CString::as_c_str);
    if extensions_supported(names(), required) {
        return Vec::new();
    }
    missing_names(names(), required)
        .into_iter()
        .map(CStr::to_owned)
        .collect()
}

/// Everything needed to judge a candidate against a surface.
pub struct DeviceProbe<'a> {
    pub instance: &'a ash::Instance,
    pub surface_loader: &'a ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    pub required_extensions: &'a [&'a CStr],
}

impl DeviceProbe<'_> {
    /// Check one physical device.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn probe(&self, physical_device: vk::PhysicalDevice) -> Result<DeviceSuitability> {
        let indices = unsafe { self.queue_families(physical_device) }?;

        let available = unsafe { query_device_extensions(self.instance, physical_device) }?;
        tracing::debug!(
            "Available device extensions: {}",
            join_names(available.iter().map(CString::as_c_str))
        );
        let missing_extensions = missing_device_extensions(&available, self.required_extensions);

        let surface = if missing_extensions.is_empty() {
            Some(unsafe {
                SurfaceCapabilities::query(self.surface_loader, physical_device, self.surface)
            }?)
        } else {
            None
        };

        Ok(DeviceSuitability {
            indices,
            missing_extensions,
            surface,
        })
    }

    /// Graphics and present families of a device for this probe's surface.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn queue_families(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<QueueFamilyIndices> {
        let families = unsafe {
            self.instance
                .get_physical_device_queue_family_properties(physical_device)
        };
        let mut present = |index: u32| -> Result<bool> {
            unsafe {
                self.surface_loader.get_physical_device_surface_support(
                    physical_device,
                    index,
                    self.surface,
                )
            }
            .context("query surface support")
        };
        find_queue_families(&families, Some(&mut present))
    }
}

/// Pick the first device in enumeration order that passes `is_suitable`.
///
/// A candidate whose check returns an error is treated as unsuitable.
pub fn pick_physical_device<D: Copy>(
    devices: &[D],
    mut is_suitable: impl FnMut(D) -> Result<bool>,
) -> Result<D> {
    if devices.is_empty() {
        return Err(GpuError::NoSuitableDevice(
            "failed to find GPUs with Vulkan support".into(),
        ));
    }

    for &device in devices {
        match is_suitable(device) {
            Ok(true) => return Ok(device),
            Ok(false) => {}
            // A failed query only rules out this candidate.
            Err(e) => tracing::warn!("Skipping GPU after failed query: {e}"),
        }
    }

    Err(GpuError::NoSuitableDevice(format!(
        "{} GPU(s) support Vulkan but none are suitable",
        devices.len()
    )))
}

/// Device name and type, for logging.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn describe_device(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> String {
    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    let name = properties
        .device_name_as_c_str()
        .map_or_else(|_| "<unnamed>".into(), CStr::to_string_lossy);
    format!("{name} ({:?})", properties.device_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn adequate_surface() -> SurfaceCapabilities {
        SurfaceCapabilities {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    #[test]
    fn empty_family_list_is_incomplete() {
        let mut present = |_: u32| -> Result<bool> { Ok(true) };
        let indices = find_queue_families(&[], Some(&mut present)).unwrap();
        assert!(!indices.is_complete());
        assert_eq!(indices, QueueFamilyIndices::default());
    }

    #[test]
    fn shared_graphics_and_present_family() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let mut present = |_: u32| -> Result<bool> { Ok(true) };
        let indices = find_queue_families(&families, Some(&mut present)).unwrap();
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.present, Some(0));
        assert_eq!(indices.unique_families(), [0]);
    }

    #[test]
    fn records_first_matching_indices() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let mut present = |i: u32| -> Result<bool> { Ok(i == 0 || i == 2) };
        let indices = find_queue_families(&families, Some(&mut present)).unwrap();
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, Some(0));
        assert_eq!(indices.unique_families(), [1, 0]);
    }

    #[test]
    fn stops_scanning_once_complete() {
        let families = [
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
        ];
        let mut queried = Vec::new();
        let mut present = |i: u32| -> Result<bool> {
            queried.push(i);
            Ok(true)
        };
        find_queue_families(&families, Some(&mut present)).unwrap();
        assert_eq!(queried, [0]);
    }

    #[test]
    fn graphics_only_mode_stops_at_graphics() {
        let families = [family(vk::QueueFlags::TRANSFER), family(vk::QueueFlags::GRAPHICS)];
        let indices = find_queue_families(&families, None).unwrap();
        assert_eq!(indices.graphics, Some(1));
        assert_eq!(indices.present, None);
        assert!(!indices.is_complete());
    }

    #[test]
    fn present_query_errors_propagate() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        let mut present = |_: u32| -> Result<bool> {
            Err(GpuError::Vulkan {
                context: "query surface support",
                result: vk::Result::ERROR_SURFACE_LOST_KHR,
            })
        };
        let err = find_queue_families(&families, Some(&mut present)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
    }

    #[test]
    fn resolved_reports_missing_family() {
        let indices = QueueFamilyIndices {
            graphics: Some(0),
            present: None,
        };
        let err = indices.resolved().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuitableDevice);
        let both = QueueFamilyIndices {
            graphics: Some(2),
            present: Some(1),
        };
        assert_eq!(both.resolved().unwrap(), (2, 1));
    }

    #[test]
    fn suitability_requires_every_check() {
        let complete = QueueFamilyIndices {
            graphics: Some(0),
            present: Some(0),
        };
        let good = DeviceSuitability {
            indices: complete,
            missing_extensions: vec![],
            surface: Some(adequate_surface()),
        };
        assert!(good.is_suitable());
        assert_eq!(good.rejection_reason(), None);

        let missing_ext = DeviceSuitability {
            missing_extensions: vec![CString::from(ash::khr::swapchain::NAME)],
            surface: None,
            ..good.clone()
        };
        assert!(!missing_ext.is_suitable());
        assert!(missing_ext
            .rejection_reason()
            .unwrap()
            .contains("VK_KHR_swapchain"));

        let no_modes = DeviceSuitability {
            surface: Some(SurfaceCapabilities {
                present_modes: vec![],
                ..adequate_surface()
            }),
            ..good.clone()
        };
        assert!(!no_modes.is_suitable());

        let no_present = DeviceSuitability {
            indices: QueueFamilyIndices {
                graphics: Some(0),
                present: None,
            },
            ..good
        };
        assert!(!no_present.is_suitable());
        assert_eq!(
            no_present.rejection_reason().as_deref(),
            Some("no present queue family")
        );
    }

    #[test]
    fn picks_first_suitable_in_order() {
        let devices = [10, 20, 30, 40];
        let mut checked = Vec::new();
        let chosen = pick_physical_device(&devices, |d| {
            checked.push(d);
            Ok(d >= 20)
        })
        .unwrap();
        assert_eq!(chosen, 20);
        assert_eq!(checked, [10, 20]);
    }

    #[test]
    fn failed_query_skips_to_next_device() {
        let chosen = pick_physical_device(&[1u32, 2], |d| {
            if d == 1 {
                Err(GpuError::Vulkan {
                    context: "enumerate device extensions",
                    result: vk::Result::ERROR_INITIALIZATION_FAILED,
                })
            } else {
                Ok(true)
            }
        })
        .unwrap();
        assert_eq!(chosen, 2);
    }

    #[test]
    fn failed_queries_on_every_device_mean_none_suitable() {
        let err = pick_physical_device(&[1u32, 2], |_| -> Result<bool> {
            Err(GpuError::Vulkan {
                context: "query surface support",
                result: vk::Result::ERROR_SURFACE_LOST_KHR,
            })
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuitableDevice);
    }

    #[test]
    fn missing_device_extensions_lists_absent_names() {
        let available = [CString::from(c"VK_KHR_maintenance1")];
        let missing = missing_device_extensions(&available, &[ash::khr::swapchain::NAME]);
        assert_eq!(missing, [CString::from(ash::khr::swapchain::NAME)]);

        let available = [
            CString::from(ash::khr::swapchain::NAME),
            CString::from(c"VK_KHR_maintenance1"),
        ];
        assert!(missing_device_extensions(&available, &[ash::khr::swapchain::NAME]).is_empty());
    }

    #[test]
    fn empty_device_list_fails() {
        let err = pick_physical_device::<u32>(&[], |_| Ok(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuitableDevice);
    }

    #[test]
    fn no_suitable_device_fails() {
        let err = pick_physical_device(&[1, 2], |_| Ok(false)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuitableDevice);
        assert!(err.to_string().contains("2 GPU(s)"));
    }
}
