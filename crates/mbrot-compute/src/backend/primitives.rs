//! Device primitives abstraction for the offload pipeline.

use std::fmt;
use std::time::{Duration, Instant};

use crate::program::ProgramSource;
use crate::ComputeResult;

/// Ordinal platform/device pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSelection {
    /// Platform index.
    pub platform: usize,
    /// Device index on that platform.
    pub device: usize,
}

impl DeviceSelection {
    pub fn new(platform: usize, device: usize) -> Self {
        Self { platform, device }
    }
}

/// Identity of the device a context was created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub platform: String,
    pub vendor: String,
    pub name: String,
    /// Global memory in bytes, if the backend could query it.
    pub global_mem_bytes: Option<u64>,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} ({})", self.platform, self.name, self.vendor)?;
        if let Some(mem) = self.global_mem_bytes {
            write!(f, ", {} MiB", mem / (1024 * 1024))?;
        }
        Ok(())
    }
}

/// How readback signals that host memory holds the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// The read call itself blocks until data has landed.
    #[default]
    Blocking,
    /// The read is enqueued non-blocking, then the whole queue is drained.
    Deferred,
}

impl Completion {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Deferred => "deferred",
        }
    }
}

/// Positional kernel argument.
#[derive(Debug)]
pub enum KernelArg<'a, B> {
    /// Device buffer (`__global` pointer).
    Buffer(&'a B),
    /// `int`
    Int(i32),
    /// `double`
    Double(f64),
}

impl<B> KernelArg<'_, B> {
    /// Type name as written in kernel source.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Buffer(_) => "__global uchar*",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
        }
    }
}

/// Core device operations.
///
/// One value of an implementing type owns a context and its in-order queue.
/// Kernels and buffers are separate owned handles; the driver drops them
/// before the primitives so children never outlive their context.
pub trait DevicePrimitives: Sized {
    /// Compiled program plus resolved entry point.
    type Kernel;
    /// Device-resident output buffer.
    type Buffer;
    /// Completion signal of an enqueued command.
    type Event;

    /// Selects a device by ordinal and creates a context with one in-order queue.
    fn open(selection: DeviceSelection) -> ComputeResult<Self>;

    /// Device the context is bound to.
    fn device(&self) -> &DeviceInfo;

    /// Builds `source` and resolves `entry_point`.
    fn build(&self, source: &ProgramSource, entry_point: &str) -> ComputeResult<Self::Kernel>;

    /// Allocates a write-only device buffer of `len` bytes.
    fn allocate(&self, len: usize) -> ComputeResult<Self::Buffer>;

    /// Binds argument `index`.
    fn set_arg(&self, kernel: &mut Self::Kernel, index: u32, arg: KernelArg<'_, Self::Buffer>) -> ComputeResult<()>;

    /// Enqueues a 2-D grid with zero offset. Does not block.
    fn enqueue(&self, kernel: &Self::Kernel, grid: [usize; 2]) -> ComputeResult<Self::Event>;

    /// Fails with `Timeout(limit)` unless `event` completed within `limit`
    /// of `start`. Blocks at most until `start + limit`.
    fn wait_within(&self, event: &Self::Event, start: Instant, limit: Duration) -> ComputeResult<()>;

    /// Copies `buffer` into `dst` after `after` completes.
    ///
    /// Returns only once the data is in `dst`, whichever discipline is used.
    fn readback(&self, buffer: &Self::Buffer, dst: &mut [u8], after: &Self::Event, completion: Completion) -> ComputeResult<()>;

    /// Backend name.
    fn name(&self) -> &'static str;
}
