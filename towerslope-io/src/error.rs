//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Malformed line in an event file.
    #[error("line {line}: {source}")]
    EventLine {
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// Required histogram group or dataset absent.
    #[error("missing {0}")]
    Missing(String),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] towerslope_core::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
