//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Every configuration error is fatal: the process must not start.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A required setting was not provided by any source.
    #[display("required setting `{_0}` has not been configured")]
    MissingField(#[error(not(source))] String),
    /// A setting was provided, but its value is unusable.
    #[display("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
    /// A configuration source could not be read or parsed.
    #[display("could not load configuration")]
    Load,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
