//! Application runner and event loop.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use trigon_gpu::{GpuContext, GpuContextBuilder, Lifecycle, Stage};
use trigon_platform::{
    check_handles, create_window, drawable_size, next_run_state, PlatformConfig, PlatformError,
    RunState, FRAME_DELAY,
};
use trigon_shaders::ShaderPaths;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Window title, also reported to the driver as the application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Compiled vertex and fragment shaders.
    pub shaders: ShaderPaths,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan lab".to_string(),
            width: 500,
            height: 500,
            validation: cfg!(debug_assertions),
            shaders: ShaderPaths::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable validation layers.
    pub const fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Read `vert.spv` and `frag.spv` from `dir`.
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shaders = ShaderPaths::in_dir(dir.into());
        self
    }

    pub fn platform_config(&self) -> PlatformConfig {
        PlatformConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            ..Default::default()
        }
    }

    pub fn gpu_builder(&self) -> GpuContextBuilder {
        GpuContextBuilder::new()
            .app_name(&self.title)
            .validation(self.validation)
            .shaders(self.shaders.clone())
            .window_size(self.width, self.height)
    }
}

/// Run the triangle app until the window is closed.
///
/// Initializes logging, opens the window, builds the GPU context and records
/// the triangle once. Startup errors are returned after the event loop exits.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + FRAME_DELAY));

    let mut runner = AppRunner {
        config,
        state: None,
        run_state: RunState::Running,
        error: None,
    };

    event_loop
        .run_app(&mut runner)
        .map_err(|e| PlatformError::EventLoop(e.to_string()))?;

    if let Some(e) = runner.error.take() {
        return Err(e);
    }

    info!("Exited cleanly");
    Ok(())
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
    run_state: RunState,
    error: Option<anyhow::Error>,
}

/// Live resources. The GPU context is declared first so its surface goes
/// before the window it was created from.
struct AppState {
    gpu: GpuContext,
    window: Window,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.error.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.run_state = next_run_state(self.run_state, &event);

        if self.run_state == RunState::Quit {
            info!("Close requested");
            if let Some(state) = self.state.take() {
                state.shutdown();
            }
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.run_state == RunState::Running {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + FRAME_DELAY));
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window = create_window(event_loop, &self.config.platform_config())?;
        check_handles(&window)?;

        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Stage::WindowCreated)?;

        let (width, height) = drawable_size(&window);
        let mut gpu = self
            .config
            .gpu_builder()
            .window_size(width, height)
            .build(&window, lifecycle)
            .context("Failed to create GPU context")?;

        let extent = gpu.swapchain().extent;
        info!(
            "Swapchain ready: {} images at {}x{}",
            gpu.framebuffers().len(),
            extent.width,
            extent.height
        );

        gpu.record_frame(0).context("Failed to record command buffer")?;
        gpu.start()?;

        Ok(AppState { gpu, window })
    }
}

impl AppState {
    fn shutdown(self) {
        info!("Starting cleanup...");
        let Self { gpu, window } = self;
        drop(gpu);
        drop(window);
        info!("Cleanup complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.title, "Vulkan lab");
        assert_eq!((config.width, config.height), (500, 500));
        assert_eq!(config.validation, cfg!(debug_assertions));
        assert_eq!(config.shaders, ShaderPaths::default());
    }

    #[test]
    fn builder_style_setters() {
        let config = AppConfig::new("triangle")
            .with_size(640, 480)
            .with_validation(false)
            .with_shader_dir("build/shaders");
        assert_eq!(config.title, "triangle");
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.validation);
        assert_eq!(config.shaders, ShaderPaths::in_dir("build/shaders"));
    }

    #[test]
    fn platform_config_is_fixed_size() {
        let platform = AppConfig::new("triangle").with_size(320, 200).platform_config();
        assert_eq!(platform.title, "triangle");
        assert_eq!((platform.width, platform.height), (320, 200));
        assert!(!platform.resizable);
    }

    #[test]
    fn gpu_builder_carries_settings() {
        let config = AppConfig::new("triangle").with_validation(true).with_size(800, 600);
        let builder = config.gpu_builder();
        let gpu = builder.config();
        assert_eq!(gpu.app.app_name, "triangle");
        assert!(gpu.validation);
        assert_eq!(gpu.window_size, (800, 600));
        assert_eq!(gpu.app.engine_name, "No engine");
    }
}
