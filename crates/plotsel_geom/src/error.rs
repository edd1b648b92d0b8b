//! Error types for geometry and coordinate conversion.

use thiserror::Error;

/// Errors raised while converting positions between data and pixel space.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// A position could not be interpreted on the given axis
    #[error("Invalid position '{value}' on axis '{axis}'")]
    InvalidPosition {
        /// The offending value as written
        value: String,
        /// Axis identifier
        axis: String,
    },

    /// The axis range has zero span and cannot map pixels
    #[error("Axis '{axis}' has a degenerate range")]
    DegenerateRange {
        /// Axis identifier
        axis: String,
    },
}

impl GeomError {
    /// Create an invalid position error.
    pub fn invalid_position(value: impl Into<String>, axis: impl Into<String>) -> Self {
        Self::InvalidPosition {
            value: value.into(),
            axis: axis.into(),
        }
    }
}

/// Result type for geometry operations.
pub type GeomResult<T> = Result<T, GeomError>;
