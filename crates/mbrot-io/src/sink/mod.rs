//! Output sinks.
//!
//! A sink owns the host-side pixel buffer the device reads back into, and
//! knows how to turn it into a durable artifact. Two strategies share one
//! contract:
//!
//! ```text
//! OutputSink
//!     +-- MappedSink  (pixel buffer is a view into a mmap'd file region)
//!     +-- StagedSink  (pixel buffer is heap memory, written out on commit)
//! ```
//!
//! Call order is always `prepare` -> `pixels_mut` (readback target) ->
//! `commit`. Using the sink out of order yields [`SinkError::NotPrepared`].

mod mapped;
mod staged;

pub use mapped::MappedSink;
pub use staged::StagedSink;

use std::fmt;
use std::path::{Path, PathBuf};

use mbrot_core::Viewport;

use crate::{SinkError, SinkResult};

/// Sink strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Device results land directly in a memory-mapped file region.
    #[default]
    Mapped,
    /// Device results land in heap memory, copied to the file on commit.
    Staged,
}

impl SinkMode {
    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mapped => "mapped",
            Self::Staged => "staged",
        }
    }
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A committed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImage {
    /// Path of the written file.
    pub path: PathBuf,
    /// Header length in bytes.
    pub header_len: usize,
    /// Pixel region length in bytes.
    pub pixel_len: usize,
}

impl FileImage {
    /// Total file length in bytes.
    pub fn total_len(&self) -> usize {
        self.header_len + self.pixel_len
    }
}

/// Common contract of both sink strategies.
pub trait OutputSink {
    /// Strategy name.
    fn mode(&self) -> SinkMode;

    /// Allocates the pixel destination for `viewport`.
    ///
    /// The mapped sink creates, sizes and maps the target file here.
    fn prepare(&mut self, viewport: &Viewport) -> SinkResult<()>;

    /// Host destination for readback, exactly `viewport.pixel_bytes()` long.
    fn pixels_mut(&mut self) -> SinkResult<&mut [u8]>;

    /// Makes the artifact durable and releases the sink's resources.
    fn commit(&mut self) -> SinkResult<FileImage>;
}

/// Creates a sink for `mode` writing to `path`.
pub fn create_sink(mode: SinkMode, path: impl AsRef<Path>) -> Box<dyn OutputSink> {
    let path = path.as_ref().to_path_buf();
    match mode {
        SinkMode::Mapped => Box::new(MappedSink::new(path)),
        SinkMode::Staged => Box::new(StagedSink::new(path)),
    }
}

fn write_failed(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::WriteFailed { path: path.to_path_buf(), source }
}

fn open_failed(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::FileOpenFailed { path: path.to_path_buf(), source }
}
