//! Platform layer for Trigon.
//!
//! Window creation via winit and the run state driven by window events.

use std::time::Duration;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use thiserror::Error;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    Handle(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Pause between event loop iterations.
pub const FRAME_DELAY: Duration = Duration::from_millis(16);

/// Platform configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan lab".to_string(),
            width: 500,
            height: 500,
            // The swapchain is never recreated.
            resizable: false,
        }
    }
}

impl PlatformConfig {
    pub fn window_attributes(&self) -> WindowAttributes {
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_resizable(self.resizable)
    }
}

/// Open a window described by `config`.
pub fn create_window(event_loop: &ActiveEventLoop, config: &PlatformConfig) -> Result<Window> {
    let window = event_loop
        .create_window(config.window_attributes())
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;
    let size = window.inner_size();
    tracing::info!(
        "Window created: {:?} ({}x{} px)",
        config.title,
        size.width,
        size.height
    );
    Ok(window)
}

/// Drawable size in pixels.
pub fn drawable_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}

/// Check that the window exposes the handles surface creation needs.
pub fn check_handles(window: &Window) -> Result<()> {
    window
        .display_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    window
        .window_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    Ok(())
}

/// Whether the event loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Quit,
}

/// Fold one window event into the run state.
///
/// Only a close request stops the loop, and once stopped it stays stopped.
pub const fn next_run_state(state: RunState, event: &WindowEvent) -> RunState {
    match (state, event) {
        (RunState::Quit, _) | (RunState::Running, WindowEvent::CloseRequested) => RunState::Quit,
        (RunState::Running, _) => RunState::Running,
    }
}
