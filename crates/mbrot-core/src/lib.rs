//! # mbrot-core
//!
//! Core types shared by every mbrot-rs crate.
//!
//! - [`Viewport`] - validated description of one rendered image
//! - [`CoreError`] - construction failures
//!
//! ## Crate Structure
//!
//! This crate has no internal dependencies. The other crates build on it:
//!
//! ```text
//! mbrot-core (this crate)
//!    ^
//!    |
//!    +-- mbrot-io (PPM header, output sinks)
//!    +-- mbrot-compute (device backends, pipeline driver)
//!    +-- mbrot-cli (command line)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod viewport;

pub use error::{CoreError, CoreResult};
pub use viewport::{Viewport, BYTES_PER_PIXEL};
