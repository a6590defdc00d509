//! Extraction Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No usable `ffmpeg` executable could be found.
    #[display("ffmpeg not detected on your system")]
    ToolNotFound,
    /// The extraction tool ran, but reported failure for this file.
    #[display("subtitle extraction failed for {}: {reason}", file.display())]
    Failed {
        /// The media file that was being extracted.
        file: PathBuf,
        /// Diagnostic message reported by the tool.
        reason: String,
    },
    /// The extraction tool could not be spawned or its output not read.
    #[display("I/O error while extracting {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A subtitle event could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
