//! Inspect command: reads rendered images back and shows their header.
//!
//! Accepts headers written with either shortest round-trip floats (this
//! tool) or C `%f` fixed decimals. Values are shown in the former, so the
//! printed text may differ from the bytes in the file.

use anyhow::{Context, Result};
use mbrot_io::read_image;

use super::format_size;
use crate::InspectArgs;

pub fn run(args: InspectArgs) -> Result<()> {
    for path in &args.input {
        let image = read_image(path).with_context(|| format!("inspect {}", path.display()))?;
        let vp = &image.viewport;

        println!("{}", path.display());
        println!("  Resolution: {}x{}", vp.width(), vp.height());
        println!("  Depth:      {}", vp.depth());
        println!("  Origin:     x0 = {} y0 = {}", vp.x0(), vp.y0());
        println!("  Increment:  {}", vp.increment());
        println!("  Header:     {} B", image.header_len);
        println!("  Pixels:     {}", format_size(image.pixels.len() as u64));

        if args.input.len() > 1 {
            println!();
        }
    }
    Ok(())
}
