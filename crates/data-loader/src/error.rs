//! Error types for the data-loader crate.
//!
//! Loading either input file can fail in three broad ways: the file is not
//! there, the bytes are not readable as CSV, or a row does not have the
//! shape the loader expects. Each gets its own variant so the caller can
//! decide how loud to be.

use thiserror::Error;

/// Errors that can occur during data loading and parsing
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV reader itself gave up (bad quoting, invalid UTF-8, ...)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row had the wrong number of fields
    #[error("Expected {expected} fields but found {found} at line {line} in {file}")]
    MalformedRow {
        file: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A numeric field in a row couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: u64,
        reason: String,
    },
}

impl DataLoadError {
    /// True for errors tied to a single row, which `MalformedRowPolicy::Skip`
    /// is allowed to swallow.
    pub fn is_row_error(&self) -> bool {
        matches!(
            self,
            DataLoadError::MalformedRow { .. } | DataLoadError::ParseError { .. }
        )
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
