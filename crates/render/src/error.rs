//! Render Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::ValidationErrors;
use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("ffmpeg not detected on your system")]
    ToolNotFound,
    /// The clip request was rejected before anything was rendered.
    #[display("invalid clip request: {_0}")]
    Invalid(#[error(not(source))] ValidationErrors),
    /// ffmpeg ran, but exited unsuccessfully. Carries its diagnostic message.
    #[display("ffmpeg failed: {_0}")]
    Failed(#[error(not(source))] String),
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
