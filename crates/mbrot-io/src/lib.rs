//! PPM artifact I/O for mbrot-rs.
//!
//! Provides the artifact header format and the two output sinks the
//! pipeline commits pixel buffers through.
//!
//! # Example
//!
//! ```no_run
//! use mbrot_core::Viewport;
//! use mbrot_io::{create_sink, SinkMode};
//!
//! let vp = Viewport::new(4, 2, 10, -2.0, 1.0, 0.5)?;
//! let mut sink = create_sink(SinkMode::Staged, "image.ppm");
//! sink.prepare(&vp)?;
//! sink.pixels_mut()?.fill(0x80);
//! let image = sink.commit()?;
//! assert_eq!(image.pixel_len, 24);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod header;
pub mod read;
pub mod sink;

pub use error::{SinkError, SinkResult};
pub use header::{format_header, parse_header};
pub use read::{read_image, PpmImage};
pub use sink::{create_sink, FileImage, MappedSink, OutputSink, SinkMode, StagedSink};
