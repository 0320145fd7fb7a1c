//! Pipeline driver: one viewport in, one committed artifact out.
//!
//! # Sequence
//!
//! ```text
//! setup    open device -> load source -> prepare sink -> allocate -> build
//! compute  bind args -> dispatch -> [deadline wait] -> readback into sink
//! commit   release device -> sink.commit()
//! ```
//!
//! The first error aborts the run. Handles acquired so far are released on
//! the way out.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mbrot_core::{CoreError, Viewport};
use mbrot_io::{FileImage, SinkError, SinkMode, create_sink};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::backend::{Backend, Completion, CpuPrimitives, DevicePrimitives, DeviceSelection, KernelArg, select_best_backend};
use crate::program::{DEFAULT_ENTRY_POINT, DEFAULT_PROGRAM, ProgramSource};
use crate::{ComputeError, ComputeResult};

/// Default artifact path.
pub const DEFAULT_OUTPUT: &str = "image.ppm";

/// Everything a run needs besides the viewport.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub backend: Backend,
    pub selection: DeviceSelection,
    /// Device program source file.
    pub program: PathBuf,
    pub entry_point: String,
    pub output: PathBuf,
    pub sink: SinkMode,
    pub completion: Completion,
    /// Upper bound on waiting for the dispatched grid.
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            selection: DeviceSelection::default(),
            program: PathBuf::from(DEFAULT_PROGRAM),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            sink: SinkMode::default(),
            completion: Completion::default(),
            deadline: None,
        }
    }
}

/// Any failure of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl PipelineError {
    /// Pipeline step that failed.
    pub fn step(&self) -> &'static str {
        match self {
            Self::Core(_) => "validate viewport",
            Self::Compute(e) => e.step(),
            Self::Sink(_) => "write output",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Phase timings and the committed artifact.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Backend that ran the program.
    pub backend: &'static str,
    /// Device description.
    pub device: String,
    /// Device selection through program build.
    pub setup: Duration,
    /// Argument binding through readback.
    pub compute: Duration,
    /// Artifact commit.
    pub commit: Duration,
    pub total: Duration,
    pub image: FileImage,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device:  {} [{}]", self.device, self.backend)?;
        writeln!(f, "setup:   {:>10.3} ms", ms(self.setup))?;
        writeln!(f, "compute: {:>10.3} ms", ms(self.compute))?;
        writeln!(f, "commit:  {:>10.3} ms", ms(self.commit))?;
        writeln!(f, "total:   {:>10.3} ms", ms(self.total))?;
        write!(f, "output:  {} ({} bytes)", self.image.path.display(), self.image.total_len())
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Runs the pipeline on the backend named in `config`.
///
/// `Backend::Auto` picks the highest priority device backend and fails with
/// `BackendNotAvailable` when there is none. The host reference device runs
/// only when asked for by name.
pub fn run_pipeline(viewport: &Viewport, config: &PipelineConfig) -> PipelineResult<PipelineReport> {
    let backend = match config.backend {
        Backend::Auto => select_best_backend().ok_or_else(|| {
            ComputeError::BackendNotAvailable(
                "no OpenCL device found; use `--backend cpu` for the host reference device".into(),
            )
        })?,
        other => other,
    };
    debug!(requested = %config.backend, selected = %backend, "backend resolved");

    match backend {
        Backend::Cpu => run_with::<CpuPrimitives>(viewport, config),
        #[cfg(feature = "opencl")]
        Backend::OpenCl => run_with::<crate::backend::ClPrimitives>(viewport, config),
        #[cfg(not(feature = "opencl"))]
        Backend::OpenCl => Err(ComputeError::BackendNotAvailable("built without the `opencl` feature".into()).into()),
        Backend::Auto => Err(ComputeError::BackendNotAvailable("backend was not resolved".into()).into()),
    }
}

/// Runs the pipeline on primitives `P`.
pub fn run_with<P: DevicePrimitives>(viewport: &Viewport, config: &PipelineConfig) -> PipelineResult<PipelineReport> {
    let start = Instant::now();
    info!(
        width = viewport.width(),
        height = viewport.height(),
        depth = viewport.depth(),
        sink = %config.sink,
        completion = config.completion.name(),
        "pipeline start"
    );

    // Setup
    let device = P::open(config.selection)?;
    let source = ProgramSource::load(&config.program)?;
    let mut sink = create_sink(config.sink, &config.output);
    sink.prepare(viewport)?;
    let buffer = device.allocate(viewport.pixel_bytes())?;
    let mut kernel = device.build(&source, &config.entry_point)?;
    let setup = start.elapsed();
    info!(ms = ms(setup), device = %device.device(), "setup done");

    // Compute
    let t = Instant::now();
    bind_viewport_args(&device, &mut kernel, &buffer, viewport)?;
    let event = device.enqueue(&kernel, viewport.grid())?;
    if let Some(limit) = config.deadline {
        device.wait_within(&event, t, limit)?;
    }
    device.readback(&buffer, sink.pixels_mut()?, &event, config.completion)?;
    let compute = t.elapsed();
    info!(ms = ms(compute), "dispatch and readback done");

    let backend = device.name();
    let device_desc = device.device().to_string();
    release(device, kernel, buffer, event);

    // Commit
    let t = Instant::now();
    let image = sink.commit()?;
    let commit = t.elapsed();
    let total = start.elapsed();
    info!(ms = ms(commit), path = %image.path.display(), bytes = image.total_len(), "artifact committed");

    Ok(PipelineReport { backend, device: device_desc, setup, compute, commit, total, image })
}

/// Binds `(out, depth, x0, y0, k)` at positions 0 to 4.
fn bind_viewport_args<P: DevicePrimitives>(
    device: &P,
    kernel: &mut P::Kernel,
    buffer: &P::Buffer,
    viewport: &Viewport,
) -> ComputeResult<()> {
    device.set_arg(kernel, 0, KernelArg::Buffer(buffer))?;
    device.set_arg(kernel, 1, KernelArg::Int(viewport.depth_i32()))?;
    device.set_arg(kernel, 2, KernelArg::Double(viewport.x0()))?;
    device.set_arg(kernel, 3, KernelArg::Double(viewport.y0()))?;
    device.set_arg(kernel, 4, KernelArg::Double(viewport.increment()))?;
    trace!("kernel arguments bound");
    Ok(())
}

/// Releases device handles: buffer, kernel and program, then queue and context.
fn release<P: DevicePrimitives>(device: P, kernel: P::Kernel, buffer: P::Buffer, event: P::Event) {
    drop(event);
    drop(buffer);
    drop(kernel);
    drop(device);
    trace!("device resources released");
}
