//! Devices command: lists backends and every enumerated device.

use anyhow::Result;
use mbrot_compute::{describe_backends, list_devices};

use super::format_size;

/// Prints backend availability, then one line per device.
///
/// With `verbose`, global memory is shown too.
pub fn run(verbose: bool) -> Result<()> {
    print!("{}", describe_backends());
    println!();

    for listing in list_devices() {
        println!("{} platform {}: {}", listing.backend, listing.index, listing.name);
        if listing.devices.is_empty() {
            println!("  (no devices)");
        }
        for (i, dev) in listing.devices.iter().enumerate() {
            println!("  device {i}: {} [{}]", dev.name, dev.vendor);
            if verbose {
                if let Some(mem) = dev.global_mem_bytes {
                    println!("    Memory: {}", format_size(mem));
                }
            }
        }
    }
    Ok(())
}
