//! Error types for mbrot-core.
//!
//! Construction of a [`crate::Viewport`] is the only fallible operation in
//! this crate. Everything downstream (device dispatch, file sinks) relies on
//! a validated viewport, so the checks live here once.
//!
//! # Usage
//!
//! ```rust
//! use mbrot_core::{CoreError, Viewport};
//!
//! let err = Viewport::new(0, 10, 16, -2.0, 1.0, 0.01).unwrap_err();
//! assert!(matches!(err, CoreError::InvalidDimensions { .. }));
//! ```

use thiserror::Error;

/// Result type alias using [`CoreError`] as the error type.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while building a viewport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Width or height is zero.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// `width * height * 3` does not fit the host's buffer size type.
    #[error("image {width}x{height} is too large for an addressable pixel buffer")]
    SizeOverflow {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Iteration bound does not fit the device `int` argument.
    #[error("depth {0} exceeds the device int range")]
    DepthOutOfRange(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_dimensions() {
        let err = CoreError::InvalidDimensions { width: 0, height: 7 };
        assert_eq!(err.to_string(), "invalid dimensions: 0x7");

        let err = CoreError::SizeOverflow { width: 9, height: 9 };
        assert!(err.to_string().contains("9x9"));
    }
}
