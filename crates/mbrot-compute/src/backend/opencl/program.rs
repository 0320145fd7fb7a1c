//! Program compilation and entry point lookup.

use opencl3::context::Context;
use opencl3::error_codes::{CL_INVALID_KERNEL_NAME, ClError};
use opencl3::kernel::Kernel;
use opencl3::program::Program;
use tracing::debug;

use super::handles::{KernelHandle, ProgramHandle, own};
use crate::program::ProgramSource;
use crate::{ComputeError, ComputeResult};

/// Built program and its entry point kernel.
///
/// Field order is release order: kernel before program.
pub struct ClKernel {
    pub(super) kernel: KernelHandle,
    _program: ProgramHandle,
    name: String,
}

impl ClKernel {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builds `source` for every device in `context` and resolves `entry_point`.
///
/// The build log is carried in the error on failure.
pub(super) fn build(context: &Context, source: &ProgramSource, entry_point: &str) -> ComputeResult<ClKernel> {
    let program = Program::create_and_build_from_source(context, source.text(), "")
        .map(own)
        .map_err(|log| ComputeError::ProgramBuildFailed(format!("{}:\n{log}", source.path().display())))?;
    debug!(path = %source.path().display(), "program built");

    let kernel = Kernel::create(&program, entry_point).map(own).map_err(|e| match e {
        ClError(CL_INVALID_KERNEL_NAME) => ComputeError::EntryPointNotFound(entry_point.to_string()),
        other => ComputeError::EntryPointNotFound(format!("{entry_point} ({other})")),
    })?;
    debug!(entry_point, "kernel created");

    Ok(ClKernel { kernel, _program: program, name: entry_point.to_string() })
}
