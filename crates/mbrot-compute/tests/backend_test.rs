//! Backend tests for mbrot-compute.

use mbrot_compute::{
    Backend, Completion, CpuPrimitives, DevicePrimitives, DeviceSelection, HOST_PLATFORM, KernelArg, ProgramSource,
    describe_backends, list_devices, select_best_backend,
};

const KERNEL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../kernels/mandelbrot.cl"));

#[test]
fn test_cpu_backend_available() {
    assert!(Backend::Cpu.is_available());
    // Auto only ever resolves to a device backend.
    assert_eq!(Backend::Auto.is_available(), select_best_backend().is_some());
}

#[test]
fn test_opencl_needs_feature() {
    if cfg!(not(feature = "opencl")) {
        assert!(!Backend::OpenCl.is_available());
    }
}

#[test]
fn test_auto_backend() {
    let best = select_best_backend();
    println!("Auto-selected backend: {best:?}");
    assert_ne!(best, Some(Backend::Auto));
    assert_ne!(best, Some(Backend::Cpu));
}

#[test]
fn test_describe_backends() {
    let desc = describe_backends();
    println!("{desc}");
    assert!(desc.contains("CPU"));
}

#[test]
fn test_list_devices_has_host() {
    let listings = list_devices();
    let host = &listings[0];
    assert_eq!(host.name, HOST_PLATFORM);
    assert_eq!(host.devices[0].platform, HOST_PLATFORM);
}

#[test]
fn test_shipped_kernel_builds_on_host() {
    let dev = CpuPrimitives::open(DeviceSelection::default()).unwrap();
    let src = ProgramSource::from_text("mandelbrot.cl", KERNEL);
    assert!(src.same_code(&ProgramSource::bundled()));
    let kernels = src.kernels().unwrap();
    assert_eq!(kernels.len(), 1);
    assert_eq!(kernels[0].params, 5);

    let mut kernel = dev.build(&src, "render").unwrap();
    assert_eq!(kernel.name(), "render");

    let buf = dev.allocate(3).unwrap();
    dev.set_arg(&mut kernel, 0, KernelArg::Buffer(&buf)).unwrap();
    dev.set_arg(&mut kernel, 1, KernelArg::Int(64)).unwrap();
    dev.set_arg(&mut kernel, 2, KernelArg::Double(0.0)).unwrap();
    dev.set_arg(&mut kernel, 3, KernelArg::Double(0.0)).unwrap();
    dev.set_arg(&mut kernel, 4, KernelArg::Double(0.1)).unwrap();

    let event = dev.enqueue(&kernel, [1, 1]).unwrap();
    let mut px = [0xFF; 3];
    dev.readback(&buf, &mut px, &event, Completion::Blocking).unwrap();
    assert_eq!(px, [0, 0, 0]);
}
