//! Reading committed artifacts back.

use std::path::Path;

use mbrot_core::Viewport;

use crate::{parse_header, SinkError, SinkResult};

/// A parsed artifact: header viewport plus pixel bytes.
#[derive(Debug, Clone)]
pub struct PpmImage {
    /// Viewport recovered from the header comment.
    pub viewport: Viewport,
    /// Header length in bytes.
    pub header_len: usize,
    /// Packed RGB pixels, row 0 first.
    pub pixels: Vec<u8>,
}

impl PpmImage {
    /// RGB triplet at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.viewport.width() || y >= self.viewport.height() {
            return None;
        }
        let i = (y as usize * self.viewport.width() as usize + x as usize) * 3;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]])
    }
}

/// Reads and validates an artifact written by either sink.
///
/// # Errors
///
/// - [`SinkError::Io`] if the file cannot be read
/// - [`SinkError::InvalidHeader`] if the header is malformed
/// - [`SinkError::SizeMismatch`] if the pixel region is not `w*h*3` bytes
pub fn read_image<P: AsRef<Path>>(path: P) -> SinkResult<PpmImage> {
    let mut bytes = std::fs::read(path)?;
    let (viewport, header_len) = parse_header(&bytes)?;

    let actual = bytes.len() - header_len;
    if actual != viewport.pixel_bytes() {
        return Err(SinkError::SizeMismatch {
            expected: viewport.pixel_bytes(),
            actual,
        });
    }

    let pixels = bytes.split_off(header_len);
    Ok(PpmImage { viewport, header_len, pixels })
}
