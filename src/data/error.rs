//! Data loading error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that halt a load
#[derive(Error, Debug)]
pub enum DataError {
    /// Source file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV framing or header error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A mapped column is absent from the header row
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// Source path does not exist
    #[error("Source not found: {0:?}")]
    NotFound(PathBuf),

    /// Loader could not be constructed
    #[error("Invalid loader setup: {0}")]
    Setup(String),
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;
