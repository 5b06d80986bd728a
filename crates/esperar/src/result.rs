//! Result and error types for Esperar.

use thiserror::Error;

/// Result type for Esperar operations
pub type EsperarResult<T> = Result<T, EsperarError>;

/// Errors an assertion invocation can settle with.
///
/// The four variants are disjoint outcomes: the selector never matched, the
/// predicate evaluated false, the interface was misused, or the remote
/// document could not be reached. Only "not yet matched" conditions are ever
/// retried; a settled outcome is final for its invocation.
#[derive(Debug, Error)]
pub enum EsperarError {
    /// Selector matched nothing: retry was disabled, or the deadline elapsed
    /// with zero matches
    #[error("Could not find element with selector {selector}")]
    ElementNotFound {
        /// Selector that never matched
        selector: String,
    },

    /// Predicate evaluated to false on a resolved element
    #[error("{message}")]
    AssertionFailed {
        /// Fully interpolated failure message (positive or negated phrasing)
        message: String,
        /// Expected value, rendered for reporting
        expected: String,
        /// Observed value, rendered for reporting
        actual: String,
    },

    /// Predicate invoked on a subject the engine cannot interpret, e.g.
    /// without the dom flag; raised synchronously, never retried
    #[error("{message}")]
    Usage {
        /// What was misused
        message: String,
    },

    /// Remote query or handle read failed below the resolve-then-assert
    /// contract (stale reference, lost connection); never retried
    #[error("transport error: {message}")]
    Transport {
        /// Driver-reported reason
        message: String,
    },
}
