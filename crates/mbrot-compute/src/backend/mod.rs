//! Device backends.
//!
//! Provides the host reference backend and the OpenCL backend behind one
//! primitives trait.
//!
//! # Architecture
//!
//! ```text
//! DevicePrimitives
//!     +-- CpuPrimitives (host platform, rayon)
//!     +-- ClPrimitives  (OpenCL platforms, `opencl` feature)
//! ```
//!
//! The pipeline driver is written once against [`DevicePrimitives`].

mod cpu_backend;
mod detect;
mod primitives;
#[cfg(any(feature = "opencl", test))]
mod release;

#[cfg(feature = "opencl")]
mod opencl;

pub use cpu_backend::{CpuBuffer, CpuEvent, CpuKernel, CpuPrimitives, HOST_PLATFORM, escape_color};
pub use detect::{
    BackendInfo, PlatformListing, describe_backends, detect_backends, list_devices, select_best_backend,
};
pub use primitives::{Completion, DeviceInfo, DevicePrimitives, DeviceSelection, KernelArg};

#[cfg(feature = "opencl")]
pub use opencl::{ClBuffer, ClKernel, ClPrimitives};

use std::fmt;

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select an available device backend. Never the host.
    #[default]
    Auto,
    /// Host reference device using rayon.
    Cpu,
    /// OpenCL platform/device.
    OpenCl,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => select_best_backend().is_some(),
            Self::Cpu => true,
            #[cfg(feature = "opencl")]
            Self::OpenCl => ClPrimitives::is_available(),
            #[cfg(not(feature = "opencl"))]
            Self::OpenCl => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::OpenCl => "opencl",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
