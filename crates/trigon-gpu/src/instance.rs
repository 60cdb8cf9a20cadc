//! Vulkan instance creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};
use crate::extensions::{join_names, layers_supported, missing_names, query_instance_layers};

/// Application identity reported to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub app_name: String,
    pub app_version: u32,
    pub engine_name: String,
    pub engine_version: u32,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            app_name: "Vulkan lab".to_string(),
            app_version: vk::make_api_version(0, 1, 0, 2),
            engine_name: "No engine".to_string(),
            engine_version: vk::make_api_version(0, 1, 0, 2),
        }
    }
}

/// Create a Vulkan instance.
///
/// Requested layers are checked before the call; any missing layer fails the
/// whole startup. When `debug_info` is given it is chained onto the create
/// info so instance creation itself is covered by the messenger.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app: &AppInfo,
    extensions: &[&CStr],
    layers: &[&CStr],
    debug_info: Option<&mut vk::DebugUtilsMessengerCreateInfoEXT<'_>>,
) -> Result<ash::Instance> {
    if !layers.is_empty() {
        let available = unsafe { query_instance_layers(entry) }?;
        if !layers_supported(available.iter().map(CString::as_c_str), layers) {
            let missing = missing_names(available.iter().map(CString::as_c_str), layers);
            return Err(GpuError::Initialization(format!(
                "validation layers requested but not available: {}",
                join_names(missing)
            )));
        }
    }

    let app_name = c_string(&app.app_name)?;
    let engine_name = c_string(&app.engine_name)?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(app.app_version)
        .engine_name(&engine_name)
        .engine_version(app.engine_version)
        .api_version(vk::API_VERSION_1_0);

    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    tracing::debug!("Required instance extensions: {}", join_names(extensions.iter().copied()));

    // Required for MoltenVK on macOS
    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    if let Some(debug_info) = debug_info {
        create_info = create_info.push_next(debug_info);
    }

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .context("create Vulkan instance")?;

    Ok(instance)
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|e| GpuError::Initialization(format!("invalid name {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_app_info() {
        let app = AppInfo::default();
        assert_eq!(app.app_name, "Vulkan lab");
        assert_eq!(app.engine_name, "No engine");
        assert_eq!(vk::api_version_major(app.app_version), 1);
        assert_eq!(vk::api_version_minor(app.app_version), 0);
        assert_eq!(vk::api_version_patch(app.app_version), 2);
    }

    #[test]
    fn names_with_nul_are_rejected() {
        let err = c_string("bad\0name").unwrap_err();
        assert!(matches!(err, GpuError::Initialization(_)));
        assert_eq!(c_string("ok").unwrap().as_c_str(), c"ok");
    }
}
