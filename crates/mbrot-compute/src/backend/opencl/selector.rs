//! Platform and device enumeration.

use opencl3::device::{CL_DEVICE_TYPE_DEFAULT, Device};
use opencl3::error_codes::{CL_DEVICE_NOT_FOUND, ClError};
use opencl3::platform::{Platform, get_platforms};
use opencl3::types::{cl_device_id, cl_int};
use tracing::debug;

use crate::backend::Backend;
use crate::backend::detect::PlatformListing;
use crate::backend::primitives::{DeviceInfo, DeviceSelection};
use crate::{ComputeError, ComputeResult};

/// Returned by the ICD loader when no vendor driver is installed.
const CL_PLATFORM_NOT_FOUND_KHR: cl_int = -1001;

fn platforms() -> ComputeResult<Vec<Platform>> {
    match get_platforms() {
        Ok(platforms) => Ok(platforms),
        Err(ClError(CL_PLATFORM_NOT_FOUND_KHR)) => Ok(Vec::new()),
        Err(e) => Err(ComputeError::ResourceExhausted(e.to_string())),
    }
}

/// Devices of the default type, in driver order.
fn devices(platform: &Platform) -> ComputeResult<Vec<cl_device_id>> {
    match platform.get_devices(CL_DEVICE_TYPE_DEFAULT) {
        Ok(ids) => Ok(ids),
        Err(ClError(CL_DEVICE_NOT_FOUND)) => Ok(Vec::new()),
        Err(e) => Err(ComputeError::ResourceExhausted(e.to_string())),
    }
}

fn describe(platform: &Platform, device: &Device) -> DeviceInfo {
    DeviceInfo {
        platform: platform.name().unwrap_or_default().trim().to_string(),
        vendor: device.vendor().unwrap_or_default().trim().to_string(),
        name: device.name().unwrap_or_default().trim().to_string(),
        global_mem_bytes: device.global_mem_size().ok(),
    }
}

/// Picks device `selection.device` on platform `selection.platform`.
pub(super) fn select(selection: DeviceSelection) -> ComputeResult<(Device, DeviceInfo)> {
    let platforms = platforms()?;
    let platform = platforms.get(selection.platform).ok_or(ComputeError::PlatformNotFound {
        index: selection.platform,
        available: platforms.len(),
    })?;

    let ids = devices(platform)?;
    let id = ids.get(selection.device).copied().ok_or(ComputeError::DeviceNotFound {
        platform: selection.platform,
        index: selection.device,
        available: ids.len(),
    })?;

    let device = Device::new(id);
    let info = describe(platform, &device);
    debug!(platform = selection.platform, device = selection.device, name = %info.name, "device selected");
    Ok((device, info))
}

/// True if at least one platform exposes a default-type device.
pub(super) fn any_device() -> bool {
    platforms()
        .map(|ps| ps.iter().any(|p| devices(p).map(|d| !d.is_empty()).unwrap_or(false)))
        .unwrap_or(false)
}

/// Every OpenCL platform with its default-type devices.
pub fn list_platforms() -> ComputeResult<Vec<PlatformListing>> {
    let mut listings = Vec::new();
    for (index, platform) in platforms()?.iter().enumerate() {
        let devices = devices(platform)?
            .into_iter()
            .map(|id| describe(platform, &Device::new(id)))
            .collect();
        listings.push(PlatformListing {
            backend: Backend::OpenCl,
            index,
            name: platform.name().unwrap_or_default().trim().to_string(),
            devices,
        });
    }
    Ok(listings)
}
