//! Error types for column vector operations.

use thiserror::Error;

/// Result type alias using [`VectorError`].
pub type Result<T> = std::result::Result<T, VectorError>;

/// Error types for column vector operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VectorError {
    /// Input text does not match the date or timestamp grammar.
    #[error("Format error: {0}")]
    FormatError(String),

    /// Value does not fit the declared precision or the physical storage width.
    #[error("Range error: {0}")]
    RangeError(String),

    /// A vector could not be created with the requested parameters.
    #[error("Construction error: {0}")]
    ConstructionError(String),

    /// Syntactically valid calendar text that names no real instant.
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// The vector has been closed and its buffers released.
    #[error("Column vector is closed")]
    Closed,

    /// Positional write beyond the allocated capacity.
    #[error("Position {position} out of bounds for capacity {capacity}")]
    IndexOutOfBounds { position: usize, capacity: usize },

    /// Export to Arrow failed.
    #[error("Arrow error: {0}")]
    ArrowError(String),
}

impl From<arrow::error::ArrowError> for VectorError {
    fn from(err: arrow::error::ArrowError) -> Self {
        VectorError::ArrowError(err.to_string())
    }
}
