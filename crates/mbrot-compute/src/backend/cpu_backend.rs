//! Host reference backend using rayon for parallelization.
//!
//! Exposes a single platform with a single device. The host cannot compile
//! device code, so it only accepts the shipped Mandelbrot program: a source
//! whose tokens differ from it fails to build. Entry points then bind to the
//! host implementation of the same name and arity. Commands run to completion
//! inside `enqueue`, and each event records when that happened.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, trace};

use super::primitives::{Completion, DeviceInfo, DevicePrimitives, DeviceSelection, KernelArg};
use crate::program::ProgramSource;
use crate::{ComputeError, ComputeResult};

/// Platform name reported by the host backend.
pub const HOST_PLATFORM: &str = "mbrot host";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Buffer,
    Int,
    Double,
}

type HostFn = fn(&[HostArg], [usize; 2]) -> ComputeResult<()>;

/// Kernel compiled into the host backend.
struct HostEntry {
    name: &'static str,
    params: &'static [ParamKind],
    run: HostFn,
}

static HOST_KERNELS: &[HostEntry] = &[HostEntry {
    name: "render",
    params: &[ParamKind::Buffer, ParamKind::Int, ParamKind::Double, ParamKind::Double, ParamKind::Double],
    run: render,
}];

#[derive(Debug, Clone)]
enum HostArg {
    Buffer(CpuBuffer),
    Int(i32),
    Double(f64),
}

impl HostArg {
    fn kind(&self) -> ParamKind {
        match self {
            Self::Buffer(_) => ParamKind::Buffer,
            Self::Int(_) => ParamKind::Int,
            Self::Double(_) => ParamKind::Double,
        }
    }
}

/// Host buffer handle. Cloning shares the same storage.
#[derive(Debug, Clone)]
pub struct CpuBuffer {
    data: Arc<Mutex<Vec<u8>>>,
    len: usize,
}

impl CpuBuffer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Resolved host kernel with its bound arguments.
pub struct CpuKernel {
    entry: &'static HostEntry,
    args: Vec<Option<HostArg>>,
}

impl CpuKernel {
    pub fn name(&self) -> &'static str {
        self.entry.name
    }
}

/// Completion signal of a host command.
#[derive(Debug, Clone, Copy)]
pub struct CpuEvent {
    completed_at: Instant,
}

/// Host primitives implementation.
pub struct CpuPrimitives {
    info: DeviceInfo,
}

impl CpuPrimitives {
    /// Device description of the only host device.
    pub fn host_device() -> DeviceInfo {
        let global_mem_bytes = sys_info::mem_info().ok().map(|m| m.total * 1024);
        DeviceInfo {
            platform: HOST_PLATFORM.to_string(),
            vendor: "rayon".to_string(),
            name: format!("host ({} threads)", rayon::current_num_threads()),
            global_mem_bytes,
        }
    }
}

impl DevicePrimitives for CpuPrimitives {
    type Kernel = CpuKernel;
    type Buffer = CpuBuffer;
    type Event = CpuEvent;

    fn open(selection: DeviceSelection) -> ComputeResult<Self> {
        if selection.platform != 0 {
            return Err(ComputeError::PlatformNotFound { index: selection.platform, available: 1 });
        }
        if selection.device != 0 {
            return Err(ComputeError::DeviceNotFound {
                platform: selection.platform,
                index: selection.device,
                available: 1,
            });
        }
        let info = Self::host_device();
        debug!(device = %info, "host context created");
        Ok(Self { info })
    }

    fn device(&self) -> &DeviceInfo {
        &self.info
    }

    fn build(&self, source: &ProgramSource, entry_point: &str) -> ComputeResult<CpuKernel> {
        let declared = source.kernels().map_err(ComputeError::ProgramBuildFailed)?;
        trace!(kernels = declared.len(), "program scanned");

        if !source.same_code(&ProgramSource::bundled()) {
            return Err(ComputeError::ProgramBuildFailed(format!(
                "{}: host device only runs the bundled {} program; use an OpenCL device for custom kernels",
                source.path().display(),
                crate::program::DEFAULT_PROGRAM
            )));
        }

        let decl = declared
            .iter()
            .find(|k| k.name == entry_point)
            .ok_or_else(|| ComputeError::EntryPointNotFound(entry_point.to_string()))?;
        let entry = HOST_KERNELS
            .iter()
            .find(|e| e.name == entry_point)
            .ok_or_else(|| ComputeError::EntryPointNotFound(entry_point.to_string()))?;

        if decl.params != entry.params.len() {
            return Err(ComputeError::ProgramBuildFailed(format!(
                "{}: kernel `{}` declares {} parameters, host device expects {}",
                source.path().display(),
                entry_point,
                decl.params,
                entry.params.len()
            )));
        }

        Ok(CpuKernel { entry, args: vec![None; entry.params.len()] })
    }

    fn allocate(&self, len: usize) -> ComputeResult<CpuBuffer> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| ComputeError::BufferAllocationFailed(format!("{len} bytes: {e}")))?;
        data.resize(len, 0);
        Ok(CpuBuffer { data: Arc::new(Mutex::new(data)), len })
    }

    fn set_arg(&self, kernel: &mut CpuKernel, index: u32, arg: KernelArg<'_, CpuBuffer>) -> ComputeResult<()> {
        let expected = kernel.entry.params.get(index as usize).copied().ok_or_else(|| {
            ComputeError::ArgumentBindingFailed {
                index,
                reason: format!("kernel `{}` takes {} arguments", kernel.entry.name, kernel.entry.params.len()),
            }
        })?;

        let type_name = arg.type_name();
        let arg = match arg {
            KernelArg::Buffer(b) => HostArg::Buffer(b.clone()),
            KernelArg::Int(v) => HostArg::Int(v),
            KernelArg::Double(v) => HostArg::Double(v),
        };
        if arg.kind() != expected {
            return Err(ComputeError::ArgumentBindingFailed {
                index,
                reason: format!("`{type_name}` does not match parameter type {expected:?}"),
            });
        }

        kernel.args[index as usize] = Some(arg);
        Ok(())
    }

    fn enqueue(&self, kernel: &CpuKernel, grid: [usize; 2]) -> ComputeResult<CpuEvent> {
        let args = kernel
            .args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                a.clone().ok_or_else(|| ComputeError::DispatchFailed(format!("argument {i} is not set")))
            })
            .collect::<ComputeResult<Vec<_>>>()?;

        (kernel.entry.run)(&args, grid)?;
        Ok(CpuEvent { completed_at: Instant::now() })
    }

    fn wait_within(&self, event: &CpuEvent, start: Instant, limit: Duration) -> ComputeResult<()> {
        let took = event.completed_at.saturating_duration_since(start);
        if took > limit {
            debug!(?took, ?limit, "host command finished past its deadline");
            return Err(ComputeError::Timeout(limit));
        }
        Ok(())
    }

    fn readback(&self, buffer: &CpuBuffer, dst: &mut [u8], _after: &CpuEvent, completion: Completion) -> ComputeResult<()> {
        if dst.len() != buffer.len {
            return Err(ComputeError::ReadbackFailed(format!(
                "destination is {} bytes, buffer is {}",
                dst.len(),
                buffer.len
            )));
        }
        let data = buffer
            .data
            .lock()
            .map_err(|_| ComputeError::ReadbackFailed("buffer lock poisoned".into()))?;
        dst.copy_from_slice(&data);
        trace!(bytes = dst.len(), completion = completion.name(), "host readback done");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpu"
    }
}

/// Escape-time color of point `(cr, ci)`.
///
/// Points that do not escape within `depth` iterations are black.
pub fn escape_color(cr: f64, ci: f64, depth: i32) -> [u8; 3] {
    let (mut zr, mut zi) = (0.0f64, 0.0f64);
    let mut i = 0;
    while i < depth && zr * zr + zi * zi <= 4.0 {
        let t = zr * zr - zi * zi + cr;
        zi = 2.0 * zr * zi + ci;
        zr = t;
        i += 1;
    }
    if i >= depth {
        return [0, 0, 0];
    }
    [((i % 8) * 32) as u8, ((i % 16) * 16) as u8, ((i % 32) * 8) as u8]
}

fn render(args: &[HostArg], grid: [usize; 2]) -> ComputeResult<()> {
    let (HostArg::Buffer(out), HostArg::Int(depth), HostArg::Double(x0), HostArg::Double(y0), HostArg::Double(k)) =
        (&args[0], &args[1], &args[2], &args[3], &args[4])
    else {
        return Err(ComputeError::DispatchFailed("argument types changed after binding".into()));
    };
    let (depth, x0, y0, k) = (*depth, *x0, *y0, *k);
    let [width, height] = grid;
    let row = width * 3;

    let mut data = out
        .data
        .lock()
        .map_err(|_| ComputeError::DispatchFailed("buffer lock poisoned".into()))?;
    if data.len() < row * height {
        return Err(ComputeError::DispatchFailed(format!(
            "grid {width}x{height} needs {} bytes, buffer has {}",
            row * height,
            data.len()
        )));
    }
    if row == 0 {
        return Ok(());
    }

    data[..row * height].par_chunks_mut(row).enumerate().for_each(|(y, line)| {
        let ci = y0 - y as f64 * k;
        for (x, px) in line.chunks_exact_mut(3).enumerate() {
            px.copy_from_slice(&escape_color(x0 + x as f64 * k, ci, depth));
        }
    });
    Ok(())
}
