//! Error types for RSDN operations.
//!
//! Every failure in the network is a precondition failure detected before any
//! computation runs, so the variants describe what was wrong with the inputs
//! or the configuration rather than how far the step got.

use thiserror::Error;

/// Main error type for RSDN construction and inference.
#[derive(Error, Debug)]
pub enum RsdnError {
    /// A tensor does not have the shape the operation requires.
    #[error("Shape mismatch for {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Batch or spatial extents disagree between tensors of one call.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Only some of the carried hidden tensors were supplied.
    #[error("Partial recurrent state: {0}")]
    PartialState(String),

    /// Saving or loading model weights failed.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// An operation received no input to work on.
    #[error("Empty input: {0}")]
    EmptyInput(String),
}

/// Result type for RSDN operations.
pub type Result<T> = std::result::Result<T, RsdnError>;

impl RsdnError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(
        tensor: impl Into<String>,
        expected: impl Into<Vec<usize>>,
        actual: impl Into<Vec<usize>>,
    ) -> Self {
        Self::ShapeMismatch {
            tensor: tensor.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a partial state error.
    pub fn partial_state(msg: impl Into<String>) -> Self {
        Self::PartialState(msg.into())
    }

    /// Create a checkpoint error.
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::Checkpoint(msg.into())
    }

    /// Create an empty input error.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }
}
