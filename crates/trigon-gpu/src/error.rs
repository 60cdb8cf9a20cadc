//! GPU error types.

use ash::vk;
use thiserror::Error;
use trigon_shaders::ShaderError;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// The Vulkan loader could not be opened.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// A Vulkan call returned a non-success result.
    #[error("Failed to {context}: {result}")]
    Vulkan {
        context: &'static str,
        result: vk::Result,
    },

    /// A prerequisite capability check failed.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// No enumerated GPU passed the suitability checks.
    #[error("No suitable GPU found: {0}")]
    NoSuitableDevice(String),

    /// A shader binary could not be loaded.
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// Coarse classification of [`GpuError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource creation or capability check failed.
    Initialization,
    /// Zero devices, or none suitable.
    NoSuitableDevice,
    /// File I/O while loading shader binaries.
    Resource,
}

impl GpuError {
    /// Which class of startup failure this is.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Loading(_) | Self::Vulkan { .. } | Self::Initialization(_) => {
                ErrorKind::Initialization
            }
            Self::NoSuitableDevice(_) => ErrorKind::NoSuitableDevice,
            Self::Shader(_) => ErrorKind::Resource,
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Attach the failing step to a raw Vulkan result.
pub trait VkResultExt<T> {
    fn context(self, context: &'static str) -> Result<T>;
}

impl<T> VkResultExt<T> for std::result::Result<T, vk::Result> {
    fn context(self, context: &'static str) -> Result<T> {
        self.map_err(|result| GpuError::Vulkan { context, result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn vulkan_failure_carries_context() {
        let raw: std::result::Result<(), vk::Result> = Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        let err = raw.context("create render pass").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert!(err.to_string().starts_with("Failed to create render pass"));
    }

    #[test]
    fn kinds() {
        assert_eq!(
            GpuError::NoSuitableDevice("none".into()).kind(),
            ErrorKind::NoSuitableDevice
        );
        assert_eq!(
            GpuError::Initialization("layers".into()).kind(),
            ErrorKind::Initialization
        );
        let shader = ShaderError::Misaligned {
            path: PathBuf::from("shaders/vert.spv"),
            len: 3,
        };
        assert_eq!(GpuError::from(shader).kind(), ErrorKind::Resource);
    }
}
