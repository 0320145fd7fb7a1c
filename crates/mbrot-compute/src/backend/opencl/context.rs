//! Context and command queue creation.

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::Device;
use tracing::trace;

use super::handles::{ContextHandle, QueueHandle, own};
use crate::{ComputeError, ComputeResult};

/// Creates a single-device context with one in-order queue.
pub(super) fn create(device: &Device) -> ComputeResult<(ContextHandle, QueueHandle)> {
    let context = Context::from_device(device)
        .map(own)
        .map_err(|e| ComputeError::ContextCreationFailed(e.to_string()))?;
    trace!("context created");

    // OpenCL 1.2 entry point; 2.0 drivers still accept it.
    #[allow(deprecated)]
    let queue = CommandQueue::create_default(&context, 0)
        .map(own)
        .map_err(|e| ComputeError::QueueCreationFailed(e.to_string()))?;
    trace!("in-order queue created");

    Ok((context, queue))
}
