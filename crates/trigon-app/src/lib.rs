//! Application framework for Trigon.
//!
//! Handles the boilerplate around the renderer:
//! - Logging setup
//! - Window creation
//! - GPU context initialization and teardown
//! - Event loop handling
//!
//! # Example
//!
//! ```no_run
//! use trigon_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::default())
//! }
//! ```

mod runner;

pub use runner::{run_app, AppConfig};

pub use trigon_gpu::{GpuContext, GpuContextBuilder, GpuError};
pub use trigon_platform::RunState;
