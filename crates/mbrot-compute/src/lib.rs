//! Compute-offload pipeline for mbrot-rs.
//!
//! Compiles a device program from source, dispatches one work-item per
//! pixel, reads the RGB buffer back and commits it through an output sink.
//!
//! # Architecture
//!
//! ```text
//! run_pipeline (PipelineDriver)
//!     └── DevicePrimitives trait
//!             ├── CpuPrimitives (host reference, rayon)
//!             └── ClPrimitives  (OpenCL, `opencl` feature)
//!     └── OutputSink (mbrot-io: mapped or staged)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mbrot_compute::{run_pipeline, PipelineConfig};
//! use mbrot_core::Viewport;
//!
//! let report = run_pipeline(&Viewport::default(), &PipelineConfig::default())?;
//! println!("{report}");
//! # Ok::<(), mbrot_compute::PipelineError>(())
//! ```

pub mod backend;
pub mod pipeline;
pub mod program;

pub use backend::{
    Backend, BackendInfo, Completion, CpuPrimitives, DeviceInfo, DevicePrimitives, DeviceSelection,
    HOST_PLATFORM, KernelArg, PlatformListing, describe_backends, detect_backends, escape_color, list_devices,
    select_best_backend,
};
#[cfg(feature = "opencl")]
pub use backend::ClPrimitives;
pub use pipeline::{DEFAULT_OUTPUT, PipelineConfig, PipelineError, PipelineReport, PipelineResult, run_pipeline, run_with};
pub use program::{DEFAULT_ENTRY_POINT, DEFAULT_PROGRAM, MANDELBROT_SOURCE, ProgramSource};

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Device-side pipeline errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("platform enumeration failed: {0}")]
    ResourceExhausted(String),

    #[error("platform {index} not available ({available} found)")]
    PlatformNotFound { index: usize, available: usize },

    #[error("device {index} on platform {platform} not available ({available} found)")]
    DeviceNotFound { platform: usize, index: usize, available: usize },

    #[error("failed to create context: {0}")]
    ContextCreationFailed(String),

    #[error("failed to create command queue: {0}")]
    QueueCreationFailed(String),

    #[error("program not found {}: {source}", path.display())]
    ProgramSourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build program: {0}")]
    ProgramBuildFailed(String),

    #[error("entry point `{0}` not found in program")]
    EntryPointNotFound(String),

    #[error("failed to create buffer: {0}")]
    BufferAllocationFailed(String),

    #[error("failed to set kernel argument {index}: {reason}")]
    ArgumentBindingFailed { index: u32, reason: String },

    #[error("failed to run program: {0}")]
    DispatchFailed(String),

    #[error("failed to read buffer: {0}")]
    ReadbackFailed(String),

    #[error("backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("device did not finish within {0:?}")]
    Timeout(Duration),
}

impl ComputeError {
    /// Pipeline step that produced this error.
    pub fn step(&self) -> &'static str {
        match self {
            Self::ResourceExhausted(_)
            | Self::PlatformNotFound { .. }
            | Self::DeviceNotFound { .. }
            | Self::ContextCreationFailed(_)
            | Self::BackendNotAvailable(_) => "create context",
            Self::QueueCreationFailed(_) => "create queue",
            Self::ProgramSourceNotFound { .. } => "load program",
            Self::ProgramBuildFailed(_) => "build program",
            Self::EntryPointNotFound(_) => "create kernel",
            Self::BufferAllocationFailed(_) => "create buffer",
            Self::ArgumentBindingFailed { .. } => "set arguments",
            Self::DispatchFailed(_) | Self::Timeout(_) => "run program",
            Self::ReadbackFailed(_) => "read buffer",
        }
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;
