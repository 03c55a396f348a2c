//! Error types for towerslope-core.

use thiserror::Error;

/// Result type alias for towerslope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for towerslope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Grid position outside the 24x64 tower grid.
    #[error("invalid grid position: (eta={eta}, phi={phi})")]
    InvalidGridPosition { eta: usize, phi: usize },

    /// Two histograms with different binning were combined.
    #[error("binning mismatch: {0}")]
    BinningMismatch(String),

    /// Invalid histogram binning (zero bins or empty range).
    #[error("invalid binning: {0}")]
    InvalidBinning(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
