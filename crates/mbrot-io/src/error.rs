//! Error types for artifact I/O.
//!
//! Every variant that touches the filesystem carries the target path and the
//! underlying [`io::Error`] so the CLI can print one self-contained line.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Output sink or artifact parsing error.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Target file could not be opened, created or truncated.
    #[error("failed to open {}: {source}", path.display())]
    FileOpenFailed {
        /// Target path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Target file could not be extended to its final size.
    #[error("failed to extend {} to {size} bytes: {source}", path.display())]
    FileExtendFailed {
        /// Target path.
        path: PathBuf,
        /// Requested total size.
        size: u64,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Target file could not be mapped into memory.
    #[error("failed to map {}: {source}", path.display())]
    MapFailed {
        /// Target path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Header or pixel bytes could not be written or synced.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        /// Target path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: io::Error,
    },

    /// Heap pixel buffer could not be allocated.
    #[error("failed to allocate {size} byte pixel buffer")]
    AllocationFailed {
        /// Requested pixel bytes.
        size: usize,
    },

    /// `pixels_mut` or `commit` called before `prepare`.
    #[error("sink used before prepare")]
    NotPrepared,

    /// Artifact does not start with a well-formed mbrot header.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Artifact length disagrees with its header.
    #[error("size mismatch: header declares {expected} pixel bytes, file has {actual}")]
    SizeMismatch {
        /// Pixel bytes implied by the header.
        expected: usize,
        /// Pixel bytes present after the header.
        actual: usize,
    },

    /// Plain read error (artifact inspection).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;
