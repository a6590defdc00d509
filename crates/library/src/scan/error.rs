use derive_more::{Display, Error};
use std::path::PathBuf;

pub(crate) type Error = exn::Exn<ErrorKind>;
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not resolve media file in the library")]
    Storage,
    #[display("could not read or write the subtitle cache")]
    Cache,
    #[display("could not extract subtitles from {}", _0.display())]
    Extract(#[error(not(source))] PathBuf),
}
