//! Backend detection, auto-selection and device listing.

use tracing::warn;

use super::Backend;
use super::cpu_backend::CpuPrimitives;
use super::primitives::DeviceInfo;

/// Information about a compute backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether backend is available.
    pub available: bool,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
    /// Description.
    pub description: &'static str,
}

/// One platform and its devices, in enumeration order.
#[derive(Debug, Clone)]
pub struct PlatformListing {
    /// Backend that owns the platform.
    pub backend: Backend,
    /// Ordinal used with `--platform`.
    pub index: usize,
    pub name: String,
    pub devices: Vec<DeviceInfo>,
}

/// Detect all available backends.
pub fn detect_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = vec![BackendInfo {
        backend: Backend::Cpu,
        name: "CPU",
        available: true,
        priority: 10,
        description: "host reference device with rayon parallelization",
    }];

    #[cfg(feature = "opencl")]
    {
        let available = super::ClPrimitives::is_available();
        backends.push(BackendInfo {
            backend: Backend::OpenCl,
            name: "OpenCL",
            available,
            priority: if available { 100 } else { 0 },
            description: "OpenCL platform device",
        });
    }

    backends.sort_by(|a, b| b.priority.cmp(&a.priority));
    backends
}

/// Select the best available device backend.
///
/// The host reference device only runs the bundled program, so it is never
/// picked here; `None` means no device backend is usable.
pub fn select_best_backend() -> Option<Backend> {
    detect_backends()
        .into_iter()
        .filter(|b| b.available && b.backend != Backend::Cpu)
        .max_by_key(|b| b.priority)
        .map(|b| b.backend)
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }
    desc
}

/// Lists every platform and device each compiled-in backend can see.
///
/// Enumeration failures of one backend are logged and skipped.
pub fn list_devices() -> Vec<PlatformListing> {
    let host = CpuPrimitives::host_device();
    #[allow(unused_mut)]
    let mut listings = vec![PlatformListing {
        backend: Backend::Cpu,
        index: 0,
        name: host.platform.clone(),
        devices: vec![host],
    }];

    #[cfg(feature = "opencl")]
    match super::opencl::list_platforms() {
        Ok(platforms) => listings.extend(platforms),
        Err(e) => warn!(error = %e, "OpenCL enumeration failed"),
    }
    #[cfg(not(feature = "opencl"))]
    warn!("built without the `opencl` feature; only the host device is listed");

    listings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_always_detected() {
        let backends = detect_backends();
        assert!(backends.iter().any(|b| b.backend == Backend::Cpu && b.available));
    }

    #[test]
    fn host_is_never_auto_selected() {
        match select_best_backend() {
            Some(best) => {
                assert_eq!(best, Backend::OpenCl);
                assert!(best.is_available());
            }
            None => assert!(!Backend::Auto.is_available()),
        }
        if cfg!(not(feature = "opencl")) {
            assert_eq!(select_best_backend(), None);
        }
    }

    #[test]
    fn description_lines() {
        let desc = describe_backends();
        assert!(desc.lines().any(|l| l.starts_with("[+] CPU:")));
    }

    #[test]
    fn host_platform_listed_first() {
        let listings = list_devices();
        assert_eq!(listings[0].backend, Backend::Cpu);
        assert_eq!(listings[0].index, 0);
        assert_eq!(listings[0].devices.len(), 1);
    }
}
