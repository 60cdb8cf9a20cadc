//! Validation-layer message routing.

use std::borrow::Cow;
use std::ffi::{c_void, CStr};

use ash::vk;

use crate::error::{GpuError, Result, VkResultExt};

/// Descriptor for the debug messenger.
///
/// The same descriptor is chained onto instance creation so messages emitted
/// while the instance itself is being created are captured too.
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
}

/// Registered debug messenger.
pub struct DebugMessenger {
    pub loader: ash::ext::debug_utils::Instance,
    pub handle: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Register the messenger on an instance.
    ///
    /// # Safety
    /// The entry and instance must be valid, and the instance must have been
    /// created with the debug-utils extension enabled.
    pub unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT<'_>,
    ) -> Result<Self> {
        // The loader would panic on a missing function pointer, so check first.
        let create_fn = unsafe {
            entry.get_instance_proc_addr(
                instance.handle(),
                c"vkCreateDebugUtilsMessengerEXT".as_ptr(),
            )
        };
        if create_fn.is_none() {
            return Err(GpuError::Initialization(format!(
                "debug messenger entry point unavailable ({})",
                vk::Result::ERROR_EXTENSION_NOT_PRESENT
            )));
        }

        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let handle = unsafe { loader.create_debug_utils_messenger(create_info, None) }
            .context("create debug messenger")?;

        Ok(Self { loader, handle })
    }

    /// Unregister the messenger.
    ///
    /// # Safety
    /// Must run before the owning instance is destroyed.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.handle, None);
        }
    }
}

/// Tracing level a validation message is forwarded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl MessageLevel {
    pub fn from_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            Self::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            Self::Warn
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            Self::Info
        } else {
            Self::Debug
        }
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message) }.to_string_lossy()
    };

    match MessageLevel::from_severity(message_severity) {
        MessageLevel::Error => tracing::error!(target: "vulkan", "[{message_type:?}] {message}"),
        MessageLevel::Warn => tracing::warn!(target: "vulkan", "[{message_type:?}] {message}"),
        MessageLevel::Info => tracing::info!(target: "vulkan", "[{message_type:?}] {message}"),
        MessageLevel::Debug => tracing::debug!(target: "vulkan", "[{message_type:?}] {message}"),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_mapping() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(MessageLevel::from_severity(S::ERROR), MessageLevel::Error);
        assert_eq!(MessageLevel::from_severity(S::WARNING), MessageLevel::Warn);
        assert_eq!(MessageLevel::from_severity(S::INFO), MessageLevel::Info);
        assert_eq!(MessageLevel::from_severity(S::VERBOSE), MessageLevel::Debug);
        assert_eq!(
            MessageLevel::from_severity(S::WARNING | S::ERROR),
            MessageLevel::Error
        );
    }

    #[test]
    fn create_info_subscribes_to_all_message_types() {
        let info = messenger_create_info();
        assert!(info.pfn_user_callback.is_some());
        assert!(info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
        assert!(!info
            .message_severity
            .contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
        assert_eq!(
            info.message_type,
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
        );
    }

    #[test]
    fn callback_never_aborts_the_call() {
        let data = vk::DebugUtilsMessengerCallbackDataEXT::default()
            .message(c"validation message for test");
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
        let null = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(null, vk::FALSE);
    }
}
