//! Error types for pixblend-core buffer construction.
//!
//! Shape problems are caller contract violations: they are reported
//! immediately and never retried.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or combining buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// Buffer dimensions are zero or do not match the data length.
    ///
    /// ```rust
    /// use pixblend_core::Error;
    ///
    /// let err = Error::invalid_dimensions(0, 4, "zero-area image");
    /// assert!(err.to_string().contains("0x4"));
    /// ```
    #[error("invalid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Width that was provided
        width: usize,
        /// Height that was provided
        height: usize,
        /// Description of the problem
        reason: String,
    },

    /// Channel count is neither 3 (RGB) nor 4 (RGBA).
    #[error("unsupported channel count {0}, expected 3 or 4")]
    UnsupportedChannels(usize),

    /// Two buffers that must share a batch size do not.
    #[error("batch mismatch: expected {expected}, got {actual}")]
    BatchMismatch {
        /// Batch size of the reference buffer
        expected: usize,
        /// Batch size that was supplied
        actual: usize,
    },
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    pub fn invalid_dimensions(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }
}
