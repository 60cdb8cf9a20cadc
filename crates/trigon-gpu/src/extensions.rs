//! Instance/device extension and validation layer negotiation.
//!
//! The set computations are plain functions over `&CStr` names; the `query_*`
//! functions are the only parts that talk to the driver.

use std::ffi::{CStr, CString};

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};

/// The Khronos validation layer name.
pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Needed on MoltenVK for devices that only partially conform.
#[cfg(target_os = "macos")]
const PORTABILITY_SUBSET: &CStr = c"VK_KHR_portability_subset";

/// Validation layers to enable when validation is requested.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![VALIDATION_LAYER]
}

/// Merge the windowing system's extensions with the ones the renderer needs.
///
/// Order is preserved and duplicates are dropped.
pub fn required_instance_extensions<'a>(
    window_extensions: &[&'a CStr],
    validation: bool,
) -> Vec<&'a CStr> {
    let mut extensions: Vec<&'a CStr> = Vec::with_capacity(window_extensions.len() + 3);
    let mut add = |name: &'a CStr| {
        if !extensions.contains(&name) {
            extensions.push(name);
        }
    };

    window_extensions.iter().copied().for_each(&mut add);
    add(ash::khr::get_physical_device_properties2::NAME);
    #[cfg(target_os = "macos")]
    add(ash::khr::portability_enumeration::NAME);
    if validation {
        add(ash::ext::debug_utils::NAME);
    }

    extensions
}

/// Device extensions every candidate GPU must expose.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    let extensions = vec![
        ash::khr::swapchain::NAME,
        #[cfg(target_os = "macos")]
        PORTABILITY_SUBSET,
    ];

    extensions
}

/// Required names that are absent from `available` (exact, case-sensitive match).
pub fn missing_names<'a, 'b>(
    available: impl IntoIterator<Item = &'a CStr>,
    required: &[&'b CStr],
) -> Vec<&'b CStr> {
    let available: Vec<&CStr> = available.into_iter().collect();
    required
        .iter()
        .copied()
        .filter(|name| !available.contains(name))
        .collect()
}

/// True iff every requested layer is available.
pub fn layers_supported<'a>(
    available: impl IntoIterator<Item = &'a CStr>,
    requested: &[&CStr],
) -> bool {
    missing_names(available, requested).is_empty()
}

/// True iff `required` is a subset of `available`.
pub fn extensions_supported<'a>(
    available: impl IntoIterator<Item = &'a CStr>,
    required: &[&CStr],
) -> bool {
    missing_names(available, required).is_empty()
}

/// Fail with the missing names unless every required instance extension is available.
pub fn check_instance_extensions<'a>(
    available: impl IntoIterator<Item = &'a CStr>,
    required: &[&CStr],
) -> Result<()> {
    let missing = missing_names(available, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(GpuError::Initialization(format!(
            "required instance extensions not available: {}",
            join_names(missing)
        )))
    }
}

/// Format names for log output.
pub fn join_names<'a>(names: impl IntoIterator<Item = &'a CStr>) -> String {
    names
        .into_iter()
        .map(CStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Layers the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn query_instance_layers(entry: &ash::Entry) -> Result<Vec<CString>> {
    let layers = unsafe { entry.enumerate_instance_layer_properties() }
        .context("enumerate instance layers")?;
    Ok(layers
        .iter()
        .filter_map(|layer| layer.layer_name_as_c_str().ok())
        .map(CStr::to_owned)
        .collect())
}

/// Instance extensions the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn query_instance_extensions(entry: &ash::Entry) -> Result<Vec<CString>> {
    let extensions = unsafe { entry.enumerate_instance_extension_properties(None) }
        .context("enumerate instance extensions")?;
    Ok(owned_extension_names(&extensions))
}

/// Device extensions a physical device reports.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn query_device_extensions(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<Vec<CString>> {
    let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }
        .context("enumerate device extensions")?;
    Ok(owned_extension_names(&extensions))
}

fn owned_extension_names(extensions: &[vk::ExtensionProperties]) -> Vec<CString> {
    extensions
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .map(CStr::to_owned)
        .collect()
}
