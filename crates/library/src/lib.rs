//! The subtitle index of a media library.
//!
//! - [`scan`] discovers the media files of a library and extracts the
//!   subtitles of every file that is not cached yet.
//! - [`Scanner`] runs that scan exactly once per process on a background task,
//!   tracking its [`ScanState`] and publishing progress through a
//!   [`ProgressHub`].
//! - [`QueryService`] answers searches, lookups and progress subscriptions
//!   while the scan is still running.

pub mod error;
mod progress;
mod query;
pub mod scan;
mod scanner;
#[cfg(test)]
mod testing;

pub use crate::progress::{Progress, ProgressHub};
pub use crate::query::{Page, QueryService};
pub use crate::scanner::{ScanState, ScanSummary, Scanner, ScannerHandle};
