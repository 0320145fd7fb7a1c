//! Heap-staged sink.
//!
//! The readback lands in an ordinary `Vec<u8>`. Nothing touches the
//! filesystem until commit, which writes header and pixels in two calls.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use mbrot_core::Viewport;
use tracing::debug;

use super::{open_failed, write_failed, FileImage, OutputSink, SinkMode};
use crate::{format_header, SinkError, SinkResult};

/// Sink whose pixel buffer lives on the heap.
pub struct StagedSink {
    path: PathBuf,
    staged: Option<Staged>,
}

struct Staged {
    header: String,
    pixels: Vec<u8>,
}

impl StagedSink {
    /// Creates an unprepared sink targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), staged: None }
    }
}

impl OutputSink for StagedSink {
    fn mode(&self) -> SinkMode {
        SinkMode::Staged
    }

    fn prepare(&mut self, viewport: &Viewport) -> SinkResult<()> {
        self.staged = None;
        let size = viewport.pixel_bytes();
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(size)
            .map_err(|_| SinkError::AllocationFailed { size })?;
        pixels.resize(size, 0);

        self.staged = Some(Staged { header: format_header(viewport), pixels });
        Ok(())
    }

    fn pixels_mut(&mut self) -> SinkResult<&mut [u8]> {
        let staged = self.staged.as_mut().ok_or(SinkError::NotPrepared)?;
        Ok(&mut staged.pixels)
    }

    fn commit(&mut self) -> SinkResult<FileImage> {
        let Staged { header, pixels } = self.staged.take().ok_or(SinkError::NotPrepared)?;
        let path = &self.path;

        let mut file = File::create(path).map_err(open_failed(path))?;
        write!(file, "{header}").map_err(write_failed(path))?;
        file.write_all(&pixels).map_err(write_failed(path))?;
        file.sync_all().map_err(write_failed(path))?;
        debug!(path = %path.display(), header_len = header.len(), pixel_len = pixels.len(), "staged buffer written");

        Ok(FileImage {
            path: path.clone(),
            header_len: header.len(),
            pixel_len: pixels.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_on_disk_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.ppm");
        let vp = Viewport::new(3, 1, 2, 0.0, 0.0, 1.0).unwrap();

        let mut sink = StagedSink::new(&path);
        sink.prepare(&vp).unwrap();
        assert!(!path.exists());

        sink.pixels_mut().unwrap().copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let image = sink.commit().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), image.total_len());
        assert_eq!(&bytes[image.header_len..], &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_viewport_is_an_error() {
        // Fits usize but exceeds isize::MAX, so no allocator can satisfy it.
        let vp = Viewport::new(1 << 31, 1 << 31, 1, 0.0, 0.0, 1.0).unwrap();
        let mut sink = StagedSink::new("never.ppm");

        match sink.prepare(&vp) {
            Err(SinkError::AllocationFailed { size }) => assert_eq!(size, 3 << 62),
            other => panic!("expected AllocationFailed, got {other:?}"),
        }
        assert!(matches!(sink.pixels_mut(), Err(SinkError::NotPrepared)));
    }

    #[test]
    fn unprepared_sink_refuses_readback() {
        let mut sink = StagedSink::new("unused.ppm");
        assert!(matches!(sink.pixels_mut(), Err(SinkError::NotPrepared)));
        assert!(matches!(sink.commit(), Err(SinkError::NotPrepared)));
    }
}
