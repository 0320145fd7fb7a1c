//! Buffer allocation, argument binding and grid dispatch.

use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::memory::{Buffer, CL_MEM_WRITE_ONLY, ClMem};
use opencl3::types::{cl_double, cl_int};
use tracing::trace;

use super::handles::{BufferHandle, EventHandle, own};
use super::program::ClKernel;
use crate::backend::primitives::KernelArg;
use crate::{ComputeError, ComputeResult};

/// Device-owned write-only output buffer.
pub struct ClBuffer {
    pub(super) buffer: BufferHandle,
    len: usize,
}

impl ClBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub(super) fn allocate(context: &Context, len: usize) -> ComputeResult<ClBuffer> {
    // SAFETY: no host pointer is passed, the device owns the storage.
    let buffer = unsafe { Buffer::<u8>::create(context, CL_MEM_WRITE_ONLY, len, ptr::null_mut()) }
        .map(own)
        .map_err(|e| ComputeError::BufferAllocationFailed(format!("{len} bytes: {e}")))?;
    trace!(bytes = len, "device buffer created");
    Ok(ClBuffer { buffer, len })
}

pub(super) fn set_arg(kernel: &mut ClKernel, index: u32, arg: KernelArg<'_, ClBuffer>) -> ComputeResult<()> {
    let type_name = arg.type_name();
    // SAFETY: each value is passed with the size of its OpenCL type; the
    // driver checks it against the declared parameter.
    let result = unsafe {
        match arg {
            KernelArg::Buffer(b) => kernel.kernel.set_arg(index, &b.buffer.get()),
            KernelArg::Int(v) => kernel.kernel.set_arg(index, &(v as cl_int)),
            KernelArg::Double(v) => kernel.kernel.set_arg(index, &(v as cl_double)),
        }
    };
    result.map_err(|e| ComputeError::ArgumentBindingFailed { index, reason: format!("{type_name}: {e}") })
}

/// Enqueues `kernel` over a 2-D grid with zero offset and no local size.
pub(super) fn enqueue(queue: &CommandQueue, kernel: &ClKernel, grid: [usize; 2]) -> ComputeResult<EventHandle> {
    let offset = [0usize; 2];
    // SAFETY: offset and grid outlive the call; arguments were bound by the caller.
    let event = unsafe {
        queue.enqueue_nd_range_kernel(kernel.kernel.get(), 2, offset.as_ptr(), grid.as_ptr(), ptr::null(), &[])
    }
    .map(own)
    .map_err(|e| ComputeError::DispatchFailed(e.to_string()))?;
    trace!(width = grid[0], height = grid[1], "grid enqueued");
    Ok(event)
}
