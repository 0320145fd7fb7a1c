//! Device handle release that cannot panic.
//!
//! A failed release is logged at `warn` and the handle is leaked. Dropping
//! never aborts an unwind or hides the error that caused it.

use std::ops::{Deref, DerefMut};

use tracing::{trace, warn};

/// A device object that is released through a fallible driver call.
pub trait Release {
    /// Object kind used in log records.
    const KIND: &'static str;

    /// Releases the object. Called at most once, from [`Handle`]'s drop.
    fn release(&mut self) -> Result<(), i32>;
}

/// Owns a releasable object and releases it on drop.
///
/// Structs holding several handles release them in field order.
pub struct Handle<T: Release> {
    inner: T,
}

impl<T: Release> Handle<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: Release> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Release> DerefMut for Handle<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: Release> Drop for Handle<T> {
    fn drop(&mut self) {
        match self.inner.release() {
            Ok(()) => trace!(kind = T::KIND, "released"),
            Err(code) => warn!(kind = T::KIND, code, "release failed, handle leaked"),
        }
    }
}
