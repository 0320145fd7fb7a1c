//! Panic-free owners for opencl3 objects.
//!
//! opencl3 releases its objects in `Drop` and panics if the driver reports
//! an error. Each object here is held in `ManuallyDrop` so its own drop never
//! runs, and the release goes through the same driver call with the error
//! logged instead. `Context` keeps a small list of device ids that is not
//! freed.

use std::mem::ManuallyDrop;

use opencl3::command_queue::{CommandQueue, release_command_queue};
use opencl3::context::{Context, context::release_context};
use opencl3::event::{Event, release_event};
use opencl3::kernel::{Kernel, release_kernel};
use opencl3::memory::{Buffer, ClMem, release_mem_object};
use opencl3::program::{Program, release_program};

use crate::backend::release::{Handle, Release};

pub type KernelHandle = Handle<ManuallyDrop<Kernel>>;
pub type ProgramHandle = Handle<ManuallyDrop<Program>>;
pub type BufferHandle = Handle<ManuallyDrop<Buffer<u8>>>;
pub type QueueHandle = Handle<ManuallyDrop<CommandQueue>>;
pub type ContextHandle = Handle<ManuallyDrop<Context>>;
pub type EventHandle = Handle<ManuallyDrop<Event>>;

/// Takes ownership of `object`; its release happens when the handle drops.
pub(super) fn own<T>(object: T) -> Handle<ManuallyDrop<T>>
where
    ManuallyDrop<T>: Release,
{
    Handle::new(ManuallyDrop::new(object))
}

// SAFETY (all impls): the wrapped object is never dropped, so its handle is
// released exactly once, here.

impl Release for ManuallyDrop<Kernel> {
    const KIND: &'static str = "kernel";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_kernel(self.get()) }
    }
}

impl Release for ManuallyDrop<Program> {
    const KIND: &'static str = "program";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_program(self.get()) }
    }
}

impl Release for ManuallyDrop<Buffer<u8>> {
    const KIND: &'static str = "buffer";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_mem_object(self.get()) }
    }
}

impl Release for ManuallyDrop<CommandQueue> {
    const KIND: &'static str = "command queue";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_command_queue(self.get()) }
    }
}

impl Release for ManuallyDrop<Context> {
    const KIND: &'static str = "context";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_context(self.get()) }
    }
}

impl Release for ManuallyDrop<Event> {
    const KIND: &'static str = "event";

    fn release(&mut self) -> Result<(), i32> {
        unsafe { release_event(self.get()) }
    }
}
