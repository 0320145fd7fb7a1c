//! Viewport descriptor.
//!
//! A [`Viewport`] fully determines one rendered image: its pixel grid
//! (`width` x `height`), the iteration bound (`depth`), the complex-plane
//! coordinate of the top-left pixel (`x0`, `y0`) and the distance between
//! neighbouring pixels (`increment`).
//!
//! ```text
//!  (x0, y0) ──────── x grows by `increment` per column ────────▶
//!     │
//!     │  row 0 is the top of the image
//!     │
//!     ▼  y shrinks by `increment` per row
//! ```
//!
//! The byte size of the image follows directly from the descriptor, see
//! [`Viewport::pixel_bytes`]. The constructor rejects descriptors whose
//! byte size would overflow `usize`, so callers never have to re-check.

use crate::error::{CoreError, CoreResult};

/// Bytes per pixel in the packed RGB layout.
pub const BYTES_PER_PIXEL: usize = 3;

/// Parameters that define a rendered image.
///
/// Immutable once built. Fields are readable through accessors only so the
/// invariants checked in [`Viewport::new`] cannot be broken afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    depth: u32,
    x0: f64,
    y0: f64,
    increment: f64,
}

impl Viewport {
    /// Default image width.
    pub const DEFAULT_WIDTH: u32 = 1980;
    /// Default image height.
    pub const DEFAULT_HEIGHT: u32 = 1080;
    /// Default iteration bound.
    pub const DEFAULT_DEPTH: u32 = 1024;
    /// Default left edge.
    pub const DEFAULT_X0: f64 = -2.0;
    /// Default top edge.
    pub const DEFAULT_Y0: f64 = 1.0;
    /// Default distance between pixels.
    pub const DEFAULT_INCREMENT: f64 = 0.002;

    /// Builds a validated viewport.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidDimensions`] if `width` or `height` is zero
    /// - [`CoreError::SizeOverflow`] if `width * height * 3` overflows `usize`
    /// - [`CoreError::DepthOutOfRange`] if `depth` does not fit an `i32`
    ///
    /// # Example
    ///
    /// ```rust
    /// use mbrot_core::Viewport;
    ///
    /// let vp = Viewport::new(4, 2, 10, -2.0, 1.0, 0.5).unwrap();
    /// assert_eq!(vp.pixel_bytes(), 24);
    /// ```
    pub fn new(
        width: u32,
        height: u32,
        depth: u32,
        x0: f64,
        y0: f64,
        increment: f64,
    ) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if i32::try_from(depth).is_err() {
            return Err(CoreError::DepthOutOfRange(depth));
        }
        checked_pixel_bytes(width, height).ok_or(CoreError::SizeOverflow { width, height })?;

        Ok(Self { width, height, depth, x0, y0, increment })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Iteration bound handed to the kernel.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Iteration bound as the device `int` argument.
    ///
    /// Lossless: [`Viewport::new`] rejects depths above `i32::MAX`.
    #[inline]
    pub fn depth_i32(&self) -> i32 {
        self.depth as i32
    }

    /// Real coordinate of the left column.
    #[inline]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    /// Imaginary coordinate of the top row.
    #[inline]
    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Distance between neighbouring pixels.
    #[inline]
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of the packed RGB pixel buffer in bytes.
    #[inline]
    pub fn pixel_bytes(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Size of one pixel row in bytes.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Global work size of the 2-D dispatch grid.
    #[inline]
    pub fn grid(&self) -> [usize; 2] {
        [self.width as usize, self.height as usize]
    }

    /// Complex-plane coordinate sampled by pixel `(x, y)`.
    pub fn point(&self, x: u32, y: u32) -> (f64, f64) {
        (
            self.x0 + x as f64 * self.increment,
            self.y0 - y as f64 * self.increment,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: Self::DEFAULT_WIDTH,
            height: Self::DEFAULT_HEIGHT,
            depth: Self::DEFAULT_DEPTH,
            x0: Self::DEFAULT_X0,
            y0: Self::DEFAULT_Y0,
            increment: Self::DEFAULT_INCREMENT,
        }
    }
}

fn checked_pixel_bytes(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}
