//! Error types for region documents and interaction commits.

use plotsel_geom::GeomError;
use thiserror::Error;

/// Errors that can occur while editing or committing regions.
#[derive(Error, Debug)]
pub enum PlotselError {
    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File read or write error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Coordinate or position error from the geometry layer
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeomError),

    /// Axis id referenced but not present in the layout
    #[error("Unknown axis: {id}")]
    UnknownAxis {
        /// The missing axis id
        id: String,
    },

    /// Region index outside the list
    #[error("Index {index} out of range for {len} regions")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Path text that yields no usable polygon
    #[error("Invalid path: {message}")]
    InvalidPath {
        /// Description of the path problem
        message: String,
    },

    /// The document refused an edit
    #[error("Commit rejected: {reason}")]
    CommitRejected {
        /// Why the edit was refused
        reason: String,
    },

    /// Document written by a newer version
    #[error("Document version {file_version} is newer than supported version {supported_version}")]
    VersionTooNew {
        /// Version found in the file
        file_version: u32,
        /// Highest version this build reads
        supported_version: u32,
    },
}

impl PlotselError {
    /// Create an unknown axis error.
    pub fn unknown_axis(id: impl Into<String>) -> Self {
        Self::UnknownAxis { id: id.into() }
    }

    /// Create an index out of range error.
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Create an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Create a commit rejected error.
    pub fn commit_rejected(reason: impl Into<String>) -> Self {
        Self::CommitRejected {
            reason: reason.into(),
        }
    }
}

/// Result type alias for region operations.
pub type PlotselResult<T> = Result<T, PlotselError>;
