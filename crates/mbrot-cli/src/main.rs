//! mbrot - Mandelbrot compute-offload CLI
//!
//! Renders an escape-time Mandelbrot image on an OpenCL device (or the host
//! reference device) and writes it as a binary PPM.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use mbrot_compute::{Backend, Completion, DEFAULT_ENTRY_POINT, DEFAULT_OUTPUT, DEFAULT_PROGRAM};
use mbrot_core::Viewport;
use mbrot_io::SinkMode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mbrot")]
#[command(author, version, about = "Mandelbrot compute-offload renderer")]
#[command(long_about = "
Renders an escape-time Mandelbrot image by dispatching one work-item per
pixel on an OpenCL device and writes the result as a binary PPM (P6).

Examples:
  mbrot render                                   # 1980x1080, depth 1024, first OpenCL device
  mbrot render 800 600 256 -2.0 1.2 0.004 -o m.ppm
  mbrot render -p kernels/mandelbrot.cl --backend opencl --platform 1
  mbrot render --backend cpu --sink staged       # Host reference device, bundled kernel only
  mbrot render --completion deferred --timeout-ms 5000
  mbrot devices                                  # List platforms and devices
  mbrot inspect image.ppm                        # Show artifact header
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an image
    #[command(visible_alias = "r")]
    Render(RenderArgs),

    /// List compute backends, platforms and devices
    #[command(visible_alias = "d")]
    Devices,

    /// Show header fields and sizes of a rendered image
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),
}

/// Arguments for the `render` command.
#[derive(Args)]
struct RenderArgs {
    /// Viewport: <width> <height> <depth> <x0> <y0> <increment> (all six or none)
    #[arg(num_args = 0..=6, allow_negative_numbers = true, value_name = "VIEWPORT")]
    viewport: Vec<String>,

    /// Device program source
    #[arg(short, long, default_value = DEFAULT_PROGRAM)]
    program: PathBuf,

    /// Kernel entry point
    #[arg(short, long, default_value = DEFAULT_ENTRY_POINT)]
    entry: String,

    /// Output image
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Output strategy
    #[arg(long, value_enum, default_value_t = SinkArg::Mapped)]
    sink: SinkArg,

    /// Compute backend (auto never picks the host; cpu runs only the bundled kernel)
    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Platform index
    #[arg(long, default_value_t = 0)]
    platform: usize,

    /// Device index on the platform
    #[arg(long, default_value_t = 0)]
    device: usize,

    /// Readback completion discipline
    #[arg(long, value_enum, default_value_t = CompletionArg::Blocking)]
    completion: CompletionArg,

    /// Give up waiting for the device after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

/// Arguments for the `inspect` command.
#[derive(Args)]
struct InspectArgs {
    /// Image(s) to inspect
    #[arg(required = true)]
    input: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SinkArg {
    Mapped,
    Staged,
}

impl From<SinkArg> for SinkMode {
    fn from(arg: SinkArg) -> Self {
        match arg {
            SinkArg::Mapped => SinkMode::Mapped,
            SinkArg::Staged => SinkMode::Staged,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Cpu,
    Opencl,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Cpu => Backend::Cpu,
            BackendArg::Opencl => Backend::OpenCl,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CompletionArg {
    Blocking,
    Deferred,
}

impl From<CompletionArg> for Completion {
    fn from(arg: CompletionArg) -> Self {
        match arg {
            CompletionArg::Blocking => Completion::Blocking,
            CompletionArg::Deferred => Completion::Deferred,
        }
    }
}

/// Parses the six positional viewport values, or returns the defaults.
fn parse_viewport(values: &[String]) -> Result<Viewport, String> {
    match values {
        [] => Ok(Viewport::default()),
        [w, h, d, x0, y0, k] => {
            let w = w.parse().map_err(|_| format!("invalid width `{w}`"))?;
            let h = h.parse().map_err(|_| format!("invalid height `{h}`"))?;
            let d = d.parse().map_err(|_| format!("invalid depth `{d}`"))?;
            let x0 = x0.parse().map_err(|_| format!("invalid x0 `{x0}`"))?;
            let y0 = y0.parse().map_err(|_| format!("invalid y0 `{y0}`"))?;
            let k = k.parse().map_err(|_| format!("invalid increment `{k}`"))?;
            Viewport::new(w, h, d, x0, y0, k).map_err(|e| e.to_string())
        }
        other => Err(format!("expected 0 or 6 viewport values, got {}", other.len())),
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match init_logging(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Render(args) => {
            let viewport = match parse_viewport(&args.viewport) {
                Ok(vp) => vp,
                Err(msg) => Cli::command().error(ErrorKind::ValueValidation, msg).exit(),
            };
            commands::render::run(args, viewport)
        }
        Commands::Devices => commands::devices::run(cli.verbose > 0),
        Commands::Inspect(args) => commands::inspect::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn viewport_defaults_and_full() {
        assert_eq!(parse_viewport(&[]).unwrap(), Viewport::default());
        let vp = parse_viewport(&strings(&["4", "2", "10", "-2.0", "1.0", "0.5"])).unwrap();
        assert_eq!((vp.width(), vp.height(), vp.depth()), (4, 2, 10));
        assert_eq!(vp.x0(), -2.0);
    }

    #[test]
    fn viewport_partial_is_rejected() {
        let err = parse_viewport(&strings(&["4", "2", "10"])).unwrap_err();
        assert!(err.contains("got 3"), "{err}");
        let err = parse_viewport(&strings(&["4", "x", "10", "0", "0", "1"])).unwrap_err();
        assert!(err.contains("height"), "{err}");
        assert!(parse_viewport(&strings(&["0", "2", "10", "0", "0", "1"])).is_err());
    }

    #[test]
    fn backend_defaults_to_auto() {
        let cli = Cli::try_parse_from(["mbrot", "render"]).unwrap();
        let Commands::Render(args) = cli.command else { panic!("expected render") };
        assert_eq!(Backend::from(args.backend), Backend::Auto);
        let cli = Cli::try_parse_from(["mbrot", "render", "--backend", "cpu"]).unwrap();
        let Commands::Render(args) = cli.command else { panic!("expected render") };
        assert_eq!(Backend::from(args.backend), Backend::Cpu);
    }

    #[test]
    fn negative_viewport_values_parse() {
        let cli = Cli::try_parse_from(["mbrot", "render", "8", "8", "16", "-2", "-1.5", "0.25", "--sink", "staged"]).unwrap();
        let Commands::Render(args) = cli.command else { panic!("expected render") };
        assert_eq!(args.viewport.len(), 6);
        assert_eq!(parse_viewport(&args.viewport).unwrap().y0(), -1.5);
    }
}
