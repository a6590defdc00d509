//! Application Error Types

use derive_more::{Display, Error};
use std::process::ExitCode;

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration is missing or unusable; nothing was started.
    #[display("configuration error")]
    Config,
    /// A component could not be constructed.
    #[display("could not start {_0}")]
    Startup(#[error(not(source))] &'static str),
    /// The requested command failed.
    #[display("{_0}")]
    Command(#[error(not(source))] String),
}

impl ErrorKind {
    /// Process exit code for an error of this kind.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config => ExitCode::from(4),
            Self::Startup(_) | Self::Command(_) => ExitCode::FAILURE,
        }
    }
}
