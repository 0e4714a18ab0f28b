//! Error types for image operations.

use thiserror::Error;

/// Error type for image operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Images have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Backdrop and source batches differ after fitting.
    #[error("batch mismatch: backdrop has {backdrop} images, source has {source_batch}")]
    BatchMismatch {
        /// Backdrop batch size
        backdrop: usize,
        /// Source batch size
        source_batch: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unrecognized name for an enumerated parameter.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant {
        /// Which enumeration was being parsed
        kind: &'static str,
        /// The rejected input
        value: String,
    },

    /// Recipe document could not be parsed.
    #[error("recipe: {0}")]
    Recipe(#[from] serde_yaml::Error),

    /// Buffer construction failed.
    #[error(transparent)]
    Core(#[from] pixblend_core::Error),
}

impl OpsError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

/// Result type for image operations.
pub type OpsResult<T> = Result<T, OpsError>;
