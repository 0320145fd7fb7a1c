//! Render command: runs the offload pipeline once.

use std::time::Duration;

use anyhow::Result;
use mbrot_compute::{DeviceSelection, PipelineConfig, run_pipeline};
use mbrot_core::Viewport;
use tracing::{info, trace};

use crate::RenderArgs;

pub fn run(args: RenderArgs, viewport: Viewport) -> Result<()> {
    trace!(program = %args.program.display(), output = %args.output.display(), "render::run");

    let config = PipelineConfig {
        backend: args.backend.into(),
        selection: DeviceSelection::new(args.platform, args.device),
        program: args.program,
        entry_point: args.entry,
        output: args.output,
        sink: args.sink.into(),
        completion: args.completion.into(),
        deadline: args.timeout_ms.map(Duration::from_millis),
    };
    info!(
        backend = %config.backend,
        platform = args.platform,
        device = args.device,
        x0 = viewport.x0(),
        y0 = viewport.y0(),
        k = viewport.increment(),
        "Rendering"
    );

    let report = run_pipeline(&viewport, &config).map_err(|e| {
        let step = e.step();
        anyhow::Error::new(e).context(step)
    })?;

    println!("{report}");
    Ok(())
}
