//! Device-to-host transfer and completion waits.

use std::thread;
use std::time::{Duration, Instant};

use opencl3::command_queue::CommandQueue;
use opencl3::event::Event;
use opencl3::types::{CL_BLOCKING, CL_NON_BLOCKING, cl_int};
use tracing::{trace, warn};

use super::dispatch::ClBuffer;
use super::handles::own;
use crate::backend::primitives::Completion;
use crate::{ComputeError, ComputeResult};

/// `CL_COMPLETE` execution status.
const COMPLETE: cl_int = 0;
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Copies `buffer` into `dst`, ordered after `after`.
///
/// Returns once the data has landed in `dst`.
pub(super) fn read_into(
    queue: &CommandQueue,
    buffer: &ClBuffer,
    dst: &mut [u8],
    after: &Event,
    completion: Completion,
) -> ComputeResult<()> {
    if dst.len() != buffer.len() {
        return Err(ComputeError::ReadbackFailed(format!(
            "destination is {} bytes, buffer is {}",
            dst.len(),
            buffer.len()
        )));
    }
    let wait_list = [after.get()];

    match completion {
        Completion::Blocking => {
            // SAFETY: blocking read; `dst` is filled when the call returns.
            unsafe { queue.enqueue_read_buffer(&buffer.buffer, CL_BLOCKING, 0, dst, &wait_list) }
                .map(own)
                .map_err(|e| ComputeError::ReadbackFailed(e.to_string()))?;
        }
        Completion::Deferred => {
            // SAFETY: `dst` stays borrowed until the read event has fired below.
            let read = unsafe { queue.enqueue_read_buffer(&buffer.buffer, CL_NON_BLOCKING, 0, dst, &wait_list) }
                .map(own)
                .map_err(|e| ComputeError::ReadbackFailed(e.to_string()))?;
            if let Err(e) = queue.finish() {
                // `dst` must not be released while the read may be in flight.
                if let Err(wait) = read.wait() {
                    warn!(error = %wait, "read event wait failed after queue drain error");
                }
                return Err(ComputeError::ReadbackFailed(e.to_string()));
            }
        }
    }
    trace!(bytes = dst.len(), completion = completion.name(), "readback done");
    Ok(())
}

/// Polls `event` until it completes or fails, giving up at `start + limit`.
pub(super) fn wait_within(event: &Event, start: Instant, limit: Duration) -> ComputeResult<()> {
    // A limit too large to add is no limit.
    let deadline = start.checked_add(limit);
    loop {
        let status = event
            .command_execution_status()
            .map_err(|e| ComputeError::DispatchFailed(e.to_string()))?;
        if status.0 == COMPLETE {
            return Ok(());
        }
        if status.0 < 0 {
            return Err(ComputeError::DispatchFailed(format!("command terminated with status {}", status.0)));
        }

        let now = Instant::now();
        let pause = match deadline {
            Some(deadline) if now >= deadline => return Err(ComputeError::Timeout(limit)),
            Some(deadline) => POLL_INTERVAL.min(deadline - now),
            None => POLL_INTERVAL,
        };
        thread::sleep(pause);
    }
}
