//! Error types for the selection and offset engines.

use thiserror::Error;

/// Errors surfaced by mask and raster operations.
///
/// Seeds that were already visited are not errors: those calls return
/// `Ok(None)`. Degenerate geometry in the offset engine is recovered
/// locally and never reaches this type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("mask size mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("seed ({x}, {y}) outside window of size {width}x{height}")]
    SeedOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    #[error("invalid pixel window: {0}")]
    InvalidWindow(String),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "python")]
impl From<Error> for pyo3::PyErr {
    fn from(err: Error) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
