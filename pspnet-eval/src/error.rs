use std::path::PathBuf;

use thiserror::Error;

/// The error type for `PSPNet-Eval-Burn` operations.
///
/// No variant is retried anywhere: inference and data loading are deterministic,
/// so every error is surfaced to the caller as soon as it happens.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error for an inconsistent evaluation setup, such as a step count larger
    /// than a finite dataset.
    #[error("Invalid configuration: {reason}")]
    Configuration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Error for when no model record exists at the given location.
    #[error("No checkpoint found at {}", path.display())]
    CheckpointNotFound {
        /// The model path that was searched.
        path: PathBuf,
    },

    /// Error for when restoring model weights fails.
    #[error("Failed to load weights: {reason}")]
    WeightLoadingFailed {
        /// The reason for the weight loading failure.
        reason: String,
    },

    /// Error for tensors or maps whose shapes do not agree.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The expected shape.
        expected: String,
        /// The actual shape.
        actual: String,
    },

    /// Error for a class id that does not fit the confusion matrix.
    #[error("Class id {class} is out of range for {num_classes} classes")]
    ClassOutOfRange {
        /// The offending class id.
        class: u32,
        /// Number of classes of the evaluation.
        num_classes: usize,
    },

    /// Error for when the sample source has no more pairs.
    #[error("Sample source exhausted after {consumed} samples")]
    Exhausted {
        /// Number of samples handed out before exhaustion.
        consumed: usize,
    },

    /// Error for when dataset operations fail.
    #[error("Dataset error: {message}")]
    Dataset {
        /// The error message.
        message: String,
    },

    /// Error for failed writes of evaluation output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    pub(crate) fn shape_mismatch(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Self::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

/// A specialized `Result` type for `PSPNet-Eval-Burn` operations.
pub type EvalResult<T> = Result<T, EvalError>;
