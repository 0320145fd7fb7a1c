//! OpenCL backend.
//!
//! Requires an OpenCL ICD loader at link time and at least one vendor
//! driver at run time.

mod context;
mod dispatch;
mod handles;
mod program;
mod readback;
mod selector;

pub use dispatch::ClBuffer;
pub use program::ClKernel;
pub use selector::list_platforms;

use std::time::{Duration, Instant};

use opencl3::device::Device;
use tracing::debug;

use handles::{ContextHandle, EventHandle, QueueHandle};

use super::primitives::{Completion, DeviceInfo, DevicePrimitives, DeviceSelection, KernelArg};
use crate::ComputeResult;
use crate::program::ProgramSource;

/// OpenCL primitives: one device, its context and one in-order queue.
///
/// Field order is release order: queue, then context. A failed release is
/// logged and skipped.
pub struct ClPrimitives {
    queue: QueueHandle,
    context: ContextHandle,
    _device: Device,
    info: DeviceInfo,
}

impl ClPrimitives {
    /// Check if any OpenCL device is reachable.
    pub fn is_available() -> bool {
        selector::any_device()
    }
}

impl DevicePrimitives for ClPrimitives {
    type Kernel = ClKernel;
    type Buffer = ClBuffer;
    type Event = EventHandle;

    fn open(selection: DeviceSelection) -> ComputeResult<Self> {
        let (device, info) = selector::select(selection)?;
        let (context, queue) = context::create(&device)?;
        debug!(device = %info, "OpenCL context created");
        Ok(Self { queue, context, _device: device, info })
    }

    fn device(&self) -> &DeviceInfo {
        &self.info
    }

    fn build(&self, source: &ProgramSource, entry_point: &str) -> ComputeResult<ClKernel> {
        program::build(&self.context, source, entry_point)
    }

    fn allocate(&self, len: usize) -> ComputeResult<ClBuffer> {
        dispatch::allocate(&self.context, len)
    }

    fn set_arg(&self, kernel: &mut ClKernel, index: u32, arg: KernelArg<'_, ClBuffer>) -> ComputeResult<()> {
        dispatch::set_arg(kernel, index, arg)
    }

    fn enqueue(&self, kernel: &ClKernel, grid: [usize; 2]) -> ComputeResult<EventHandle> {
        dispatch::enqueue(&self.queue, kernel, grid)
    }

    fn wait_within(&self, event: &EventHandle, start: Instant, limit: Duration) -> ComputeResult<()> {
        readback::wait_within(event, start, limit)
    }

    fn readback(&self, buffer: &ClBuffer, dst: &mut [u8], after: &EventHandle, completion: Completion) -> ComputeResult<()> {
        readback::read_into(&self.queue, buffer, dst, after, completion)
    }

    fn name(&self) -> &'static str {
        "opencl"
    }
}
