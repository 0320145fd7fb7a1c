//! End-to-end pipeline tests for mbrot-compute.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mbrot_compute::{
    Backend, Completion, ComputeError, DeviceSelection, PipelineConfig, PipelineError, escape_color, run_pipeline,
};
use mbrot_core::Viewport;
use mbrot_io::{SinkError, SinkMode, read_image};

fn kernel_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../kernels/mandelbrot.cl"))
}

fn host_config(output: &Path, sink: SinkMode) -> PipelineConfig {
    PipelineConfig {
        backend: Backend::Cpu,
        program: kernel_path(),
        output: output.to_path_buf(),
        sink,
        ..Default::default()
    }
}

fn compute_err(result: Result<impl std::fmt::Debug, PipelineError>) -> ComputeError {
    match result {
        Err(PipelineError::Compute(e)) => e,
        other => panic!("expected compute error, got {other:?}"),
    }
}

#[test]
fn test_scenario_four_by_two() {
    let dir = tempfile::tempdir().unwrap();
    let vp = Viewport::new(4, 2, 10, -2.0, 1.0, 0.5).unwrap();

    for sink in [SinkMode::Mapped, SinkMode::Staged] {
        let out = dir.path().join(format!("scenario_{sink}.ppm"));
        let report = run_pipeline(&vp, &host_config(&out, sink)).unwrap();
        assert_eq!(report.backend, "cpu");
        assert_eq!(report.image.pixel_len, 24);
        assert!(report.total >= report.setup + report.compute);

        let bytes = std::fs::read(&out).unwrap();
        let lines: Vec<&[u8]> = bytes.splitn(5, |b| *b == b'\n').collect();
        assert_eq!(lines[2], b"4 2");
        assert_eq!(lines[3], b"255");
        assert_eq!(lines[4].len(), 24);

        let image = read_image(&out).unwrap();
        assert_eq!(image.pixel(0, 0), Some([32, 16, 8]));
        assert_eq!(image.pixel(3, 1), Some([0, 0, 0]));
    }
}

#[test]
fn test_every_pixel_matches_reference() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("ref.ppm");
    let vp = Viewport::new(23, 17, 50, -2.1, 1.2, 0.13).unwrap();
    run_pipeline(&vp, &host_config(&out, SinkMode::Mapped)).unwrap();

    let image = read_image(&out).unwrap();
    for y in 0..vp.height() {
        for x in 0..vp.width() {
            let (cr, ci) = vp.point(x, y);
            assert_eq!(image.pixel(x, y), Some(escape_color(cr, ci, 50)), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_sink_modes_and_completions_agree() {
    let dir = tempfile::tempdir().unwrap();
    let vp = Viewport::new(64, 48, 200, -2.0, 1.2, 2.4 / 48.0).unwrap();

    let mut outputs = Vec::new();
    for sink in [SinkMode::Mapped, SinkMode::Staged] {
        for completion in [Completion::Blocking, Completion::Deferred] {
            let out = dir.path().join(format!("{sink}_{}.ppm", completion.name()));
            let config = PipelineConfig { completion, ..host_config(&out, sink) };
            run_pipeline(&vp, &config).unwrap();
            outputs.push(std::fs::read(&out).unwrap());
        }
    }
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let vp = Viewport::new(40, 30, 300, -0.75, 0.1, 0.001).unwrap();
    let a = dir.path().join("a.ppm");
    let b = dir.path().join("b.ppm");

    run_pipeline(&vp, &host_config(&a, SinkMode::Mapped)).unwrap();
    run_pipeline(&vp, &host_config(&b, SinkMode::Mapped)).unwrap();
    assert_eq!(read_image(&a).unwrap().pixels, read_image(&b).unwrap().pixels);
}

#[test]
fn test_single_pixel_and_zero_depth() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("one.ppm");

    let vp = Viewport::new(1, 1, 0, -2.0, 1.0, 0.5).unwrap();
    let report = run_pipeline(&vp, &host_config(&out, SinkMode::Staged)).unwrap();
    assert_eq!(report.image.pixel_len, 3);
    assert_eq!(read_image(&out).unwrap().pixels, vec![0, 0, 0]);

    let vp = Viewport::new(8, 8, 0, -2.0, 1.0, 0.25).unwrap();
    run_pipeline(&vp, &host_config(&out, SinkMode::Mapped)).unwrap();
    assert!(read_image(&out).unwrap().pixels.iter().all(|b| *b == 0));
}

#[test]
fn test_generous_deadline_completes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("deadline.ppm");
    let vp = Viewport::new(16, 16, 32, -2.0, 1.0, 0.125).unwrap();
    let config = PipelineConfig {
        deadline: Some(Duration::from_secs(60)),
        completion: Completion::Deferred,
        ..host_config(&out, SinkMode::Mapped)
    };
    run_pipeline(&vp, &config).unwrap();
    assert_eq!(read_image(&out).unwrap().pixel(0, 0), Some([32, 16, 8]));
}

#[test]
fn test_expired_deadline_skips_readback() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("late.ppm");
    let vp = Viewport::new(64, 64, 256, -2.0, 1.0, 2.0 / 64.0).unwrap();
    let config = PipelineConfig { deadline: Some(Duration::ZERO), ..host_config(&out, SinkMode::Mapped) };

    let result = run_pipeline(&vp, &config);
    assert_eq!(result.as_ref().err().map(PipelineError::step), Some("run program"));
    assert!(matches!(compute_err(result), ComputeError::Timeout(limit) if limit == Duration::ZERO));

    // The mapped file was sized up front; no pixel was read back into it.
    let image = read_image(&out).unwrap();
    assert_eq!(image.pixels.len(), vp.pixel_bytes());
    assert!(image.pixels.iter().all(|b| *b == 0));
}

#[test]
fn test_out_of_range_selection() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();

    let config = PipelineConfig { selection: DeviceSelection::new(7, 0), ..host_config(&out, SinkMode::Mapped) };
    let err = compute_err(run_pipeline(&vp, &config));
    assert!(matches!(err, ComputeError::PlatformNotFound { index: 7, .. }));

    let config = PipelineConfig { selection: DeviceSelection::new(0, 2), ..host_config(&out, SinkMode::Mapped) };
    let err = compute_err(run_pipeline(&vp, &config));
    assert!(matches!(err, ComputeError::DeviceNotFound { index: 2, .. }));

    // Nothing was opened, so nothing was written.
    assert!(!out.exists());
}

#[test]
fn test_missing_program_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("never.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { program: dir.path().join("missing.cl"), ..host_config(&out, SinkMode::Mapped) };

    let result = run_pipeline(&vp, &config);
    let step = result.as_ref().err().map(PipelineError::step);
    assert_eq!(step, Some("load program"));
    assert!(matches!(compute_err(result), ComputeError::ProgramSourceNotFound { .. }));
    assert!(!out.exists());
}

#[cfg(target_pointer_width = "64")]
#[test]
fn test_staged_allocation_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("huge.ppm");
    let vp = Viewport::new(1 << 31, 1 << 31, 1, 0.0, 0.0, 1.0).unwrap();

    let result = run_pipeline(&vp, &host_config(&out, SinkMode::Staged));
    assert_eq!(result.as_ref().err().map(PipelineError::step), Some("write output"));
    assert!(matches!(result, Err(PipelineError::Sink(SinkError::AllocationFailed { .. }))));
    assert!(!out.exists());
}

#[test]
fn test_unknown_entry_point() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("entry.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { entry_point: "draw".into(), ..host_config(&out, SinkMode::Staged) };

    let err = compute_err(run_pipeline(&vp, &config));
    assert_eq!(err.step(), "create kernel");
    assert!(matches!(err, ComputeError::EntryPointNotFound(name) if name == "draw"));
}

#[test]
fn test_host_rejects_custom_program() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("solid.cl");
    std::fs::write(
        &program,
        "__kernel void render(__global uchar *out, int depth, double x0, double y0, double k)\n\
         {\n    out[(get_global_id(1) * get_global_size(0) + get_global_id(0)) * 3] = 255;\n}\n",
    )
    .unwrap();
    let out = dir.path().join("solid.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { program, ..host_config(&out, SinkMode::Staged) };

    let err = compute_err(run_pipeline(&vp, &config));
    assert_eq!(err.step(), "build program");
    assert!(matches!(err, ComputeError::ProgramBuildFailed(log) if log.contains("solid.cl")));
    assert!(!out.exists());
}

#[test]
fn test_broken_program_is_build_error() {
    let dir = tempfile::tempdir().unwrap();
    let program = dir.path().join("broken.cl");
    std::fs::write(&program, "__kernel void render(__global uchar *out, int depth {\n").unwrap();
    let out = dir.path().join("broken.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { program, ..host_config(&out, SinkMode::Staged) };

    let err = compute_err(run_pipeline(&vp, &config));
    assert_eq!(err.step(), "build program");
    assert!(matches!(err, ComputeError::ProgramBuildFailed(_)));
}

#[cfg(not(feature = "opencl"))]
#[test]
fn test_opencl_without_feature() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cl.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { backend: Backend::OpenCl, ..host_config(&out, SinkMode::Staged) };

    assert!(matches!(compute_err(run_pipeline(&vp, &config)), ComputeError::BackendNotAvailable(_)));
}

#[cfg(not(feature = "opencl"))]
#[test]
fn test_auto_never_falls_back_to_host() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("auto.ppm");
    let vp = Viewport::new(2, 2, 1, 0.0, 0.0, 1.0).unwrap();
    let config = PipelineConfig { backend: Backend::Auto, ..host_config(&out, SinkMode::Mapped) };

    let err = compute_err(run_pipeline(&vp, &config));
    assert!(matches!(&err, ComputeError::BackendNotAvailable(msg) if msg.contains("cpu")), "{err}");
    assert!(!out.exists());
}

#[cfg(feature = "opencl")]
#[test]
fn test_opencl_matches_host() {
    if !Backend::OpenCl.is_available() {
        eprintln!("no OpenCL device, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let vp = Viewport::new(32, 24, 64, -2.0, 1.0, 0.1).unwrap();
    let host = dir.path().join("host.ppm");
    let cl = dir.path().join("cl.ppm");

    run_pipeline(&vp, &host_config(&host, SinkMode::Staged)).unwrap();
    let config = PipelineConfig { backend: Backend::OpenCl, ..host_config(&cl, SinkMode::Mapped) };
    let report = run_pipeline(&vp, &config).unwrap();
    assert_eq!(report.backend, "opencl");

    let host = read_image(&host).unwrap();
    let cl = read_image(&cl).unwrap();
    assert_eq!(host.pixels.len(), cl.pixels.len());
    // Devices without exact IEEE doubles may differ on boundary pixels.
    let differing = host.pixels.chunks(3).zip(cl.pixels.chunks(3)).filter(|(a, b)| a != b).count();
    assert!(differing * 100 <= vp.pixel_count(), "{differing} pixels differ");
}
