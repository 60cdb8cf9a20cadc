//! Application lifecycle and the startup sequencer.
//!
//! Startup is a strictly linear chain. Each stage consumes handles produced by
//! the one before it, transitions are one-way, and any failure aborts straight
//! into reverse teardown of what was already built.

use std::fmt;

use crate::error::{GpuError, Result};
use crate::release::ReleaseStack;

/// Lifecycle states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Uninitialized,
    WindowCreated,
    InstanceReady,
    DebugMessengerReady,
    SurfaceReady,
    PhysicalDeviceChosen,
    DeviceReady,
    SwapchainReady,
    RenderPassReady,
    PipelineReady,
    FramebuffersReady,
    CommandPoolReady,
    CommandBufferReady,
    Running,
    ShuttingDown,
    Destroyed,
}

impl Stage {
    const ORDER: [Self; 16] = [
        Self::Uninitialized,
        Self::WindowCreated,
        Self::InstanceReady,
        Self::DebugMessengerReady,
        Self::SurfaceReady,
        Self::PhysicalDeviceChosen,
        Self::DeviceReady,
        Self::SwapchainReady,
        Self::RenderPassReady,
        Self::PipelineReady,
        Self::FramebuffersReady,
        Self::CommandPoolReady,
        Self::CommandBufferReady,
        Self::Running,
        Self::ShuttingDown,
        Self::Destroyed,
    ];

    /// The next stage in the chain, if any.
    pub fn successor(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|&s| s == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    /// Stages that may be skipped (only present when a feature is enabled).
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::DebugMessengerReady)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One-way state machine over [`Stage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifecycle {
    stage: Stage,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            stage: Stage::Uninitialized,
        }
    }

    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `next`, which must be the immediate successor or reachable by
    /// skipping optional stages only.
    pub fn advance(&mut self, next: Stage) -> Result<()> {
        let mut candidate = self.stage.successor();
        while let Some(stage) = candidate {
            if stage == next {
                self.stage = next;
                return Ok(());
            }
            if !stage.is_optional() {
                break;
            }
            candidate = stage.successor();
        }
        Err(GpuError::Initialization(format!(
            "invalid lifecycle transition {} -> {next}",
            self.stage
        )))
    }

    /// Abort: jump to teardown from wherever startup stopped.
    pub fn fail(&mut self) {
        if self.stage < Stage::ShuttingDown {
            self.stage = Stage::ShuttingDown;
        }
    }

    /// Begin orderly shutdown from `Running`.
    pub fn shut_down(&mut self) -> Result<()> {
        self.advance(Stage::ShuttingDown)
    }

    /// Teardown complete.
    pub fn finish(&mut self) -> Result<()> {
        self.advance(Stage::Destroyed)
    }
}

/// Runs creation steps, recording a release for each that succeeds.
///
/// Dropping a `Startup` that never reached [`Startup::finish`] marks the
/// lifecycle failed and releases completed steps newest first.
#[derive(Debug, Default)]
pub struct Startup {
    lifecycle: Lifecycle,
    releases: ReleaseStack,
}

impl Startup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing lifecycle (e.g. after the window was created).
    pub fn resume(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle,
            releases: ReleaseStack::new(),
        }
    }

    pub const fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    /// Advance the lifecycle once a stage's resources all exist.
    pub fn enter(&mut self, stage: Stage) -> Result<()> {
        self.lifecycle.advance(stage)?;
        tracing::info!("Entered {stage}");
        Ok(())
    }

    /// Run one creation step. The release is registered only on success.
    pub fn acquire<T, R>(
        &mut self,
        label: impl Into<String>,
        create: impl FnOnce() -> Result<(T, R)>,
    ) -> Result<T>
    where
        R: FnOnce() + 'static,
    {
        let (value, release) = create()?;
        self.releases.push(label, release);
        Ok(value)
    }

    /// Labels of acquired resources, in acquisition order.
    pub fn acquired(&self) -> Vec<&str> {
        self.releases.labels()
    }

    /// Hand over the lifecycle and release stack after a successful startup.
    pub fn finish(mut self) -> (Lifecycle, ReleaseStack) {
        let lifecycle = self.lifecycle.clone();
        let releases = std::mem::take(&mut self.releases);
        // Prevent Drop from marking the lifecycle failed.
        self.lifecycle.stage = Stage::Destroyed;
        (lifecycle, releases)
    }
}

impl Drop for Startup {
    fn drop(&mut self) {
        if self.lifecycle.stage() == Stage::Destroyed {
            return;
        }
        tracing::warn!(
            "Startup aborted at {}; releasing {} resources",
            self.lifecycle.stage(),
            self.releases.len()
        );
        self.lifecycle.fail();
        self.releases.release_all();
    }
}
