//! Memory-mapped sink.
//!
//! The file is created at its final size up front and mapped shared, so the
//! readback writes straight into the bytes the kernel will persist. Commit
//! is an msync + munmap + close.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use memmap2::{MmapMut, MmapOptions};
use mbrot_core::Viewport;
use tracing::{debug, trace};

use super::{open_failed, write_failed, FileImage, OutputSink, SinkMode};
use crate::{format_header, SinkError, SinkResult};

/// Open mapping plus the file descriptor backing it.
struct Mapping {
    // Field order matters: unmap before close.
    map: MmapMut,
    file: File,
    header_len: usize,
}

/// Sink whose pixel buffer is a view into the mapped output file.
pub struct MappedSink {
    path: PathBuf,
    mapping: Option<Mapping>,
}

impl MappedSink {
    /// Creates an unprepared sink targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), mapping: None }
    }

    fn open_and_map(&self, viewport: &Viewport) -> SinkResult<Mapping> {
        let path = &self.path;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(open_failed(path))?;

        let header = format_header(viewport);
        let header_len = header.len();
        let total = header_len + viewport.pixel_bytes();
        debug!(path = %path.display(), header_len, total, "extending output file");

        // Size the file before mapping by writing its last byte.
        extend(&file, total as u64).map_err(|source| SinkError::FileExtendFailed {
            path: path.clone(),
            size: total as u64,
            source,
        })?;

        // SAFETY: the file was just created and truncated by this process and
        // stays owned by the sink for the mapping's whole lifetime.
        let mut map = unsafe { MmapOptions::new().len(total).map_mut(&file) }
            .map_err(|source| SinkError::MapFailed { path: path.clone(), source })?;

        map[..header_len].copy_from_slice(header.as_bytes());
        trace!(path = %path.display(), "header written to mapping");

        Ok(Mapping { map, file, header_len })
    }
}

fn extend(mut file: &File, total: u64) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(total - 1))?;
    file.write_all(&[0])?;
    Ok(())
}

impl OutputSink for MappedSink {
    fn mode(&self) -> SinkMode {
        SinkMode::Mapped
    }

    fn prepare(&mut self, viewport: &Viewport) -> SinkResult<()> {
        // Drop any previous mapping before truncating the file under it.
        self.mapping = None;
        self.mapping = Some(self.open_and_map(viewport)?);
        Ok(())
    }

    fn pixels_mut(&mut self) -> SinkResult<&mut [u8]> {
        let mapping = self.mapping.as_mut().ok_or(SinkError::NotPrepared)?;
        Ok(&mut mapping.map[mapping.header_len..])
    }

    fn commit(&mut self) -> SinkResult<FileImage> {
        let mapping = self.mapping.take().ok_or(SinkError::NotPrepared)?;
        let total = mapping.map.len();

        mapping.map.flush().map_err(write_failed(&self.path))?;
        debug!(path = %self.path.display(), total, "mapping synced");

        let Mapping { map, file, header_len } = mapping;
        drop(map);
        drop(file);

        Ok(FileImage {
            path: self.path.clone(),
            header_len,
            pixel_len: total - header_len,
        })
    }
}
