//! Trigon viewer
//!
//! Opens a 500x500 window, sets up Vulkan end to end and records a single
//! red-cleared render pass that draws a triangle.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p trigon-viewer
//! ```
//!
//! The compiled shaders are read from `shaders/vert.spv` and `shaders/frag.spv`
//! relative to the working directory.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use trigon_app::{run_app, AppConfig};

fn main() -> anyhow::Result<()> {
    // Check for help flag before starting the app
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    run_app(AppConfig::default())
}

fn print_help() {
    eprintln!(
        "Trigon viewer: renders one triangle with Vulkan

USAGE:
    cargo run -p trigon-viewer

OPTIONS:
    -h, --help              Print this help message

FILES:
    shaders/vert.spv        Compiled vertex shader
    shaders/frag.spv        Compiled fragment shader

Validation layers are enabled in debug builds.

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
