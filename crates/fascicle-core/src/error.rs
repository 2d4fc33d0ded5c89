//! Error types for the clustering core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Clustering core errors
///
/// Malformed streamlines are expected to be rejected by the loading layer;
/// anything surfacing here identifies the offending entity by index so the
/// caller never sees a generic failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Streamline cannot be resampled (too few points or zero arc length)
    #[error("degenerate streamline {index}: {reason}")]
    DegenerateInput { index: usize, reason: String },

    /// Point-count or scalar-length mismatch between compared entities
    #[error("dimension mismatch for entity {index}: expected {expected}, found {found}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Inconsistent run configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a degenerate-input error
    pub fn degenerate(index: usize, reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            index,
            reason: reason.into(),
        }
    }

    /// Create a dimension-mismatch error
    pub fn mismatch(index: usize, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            index,
            expected,
            found,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Non-fatal conditions reported alongside a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RunWarning {
    /// The input streamline set was empty; all outputs are empty
    EmptyInput,
    /// Unsupervised mode found no group structure at the configured
    /// threshold (every candidate ended up a singleton)
    ThresholdExhaustion,
}
