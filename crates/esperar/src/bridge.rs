//! Normalization of driver-native results into engine results.
//!
//! Driver backends hand back their own future and error shapes; those are
//! converted into [`EsperarResult`] exactly once, at the boundary, with the
//! rejection reason preserved verbatim. Single-handle resolutions cross the
//! boundary boxed in [`Resolved`]: a handle is never yielded bare from a
//! resolution path, so nothing downstream can mistake an object with a
//! `then`-shaped method for an awaitable and wait on it.

use crate::driver::ElementRef;
use crate::result::EsperarError;
use std::fmt::Display;

/// A single-handle resolution, boxed in a plain record.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The resolved element handle
    pub el: ElementRef,
}

impl Resolved {
    /// Box a handle
    #[must_use]
    pub fn new(el: ElementRef) -> Self {
        Self { el }
    }
}

/// Adapt a driver-native failure into a transport rejection, keeping the
/// driver's reason text.
pub fn transport<E: Display>(err: E) -> EsperarError {
    EsperarError::Transport {
        message: err.to_string(),
    }
}
