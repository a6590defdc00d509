//! Subtitle sources.
//!
//! A [`SubtitleSource`] turns a media file on disk into its raw text-track
//! [`Event`]s. The scanner only ever talks to sources through this trait, so
//! the expensive external tool can be replaced by a stub in tests.

mod ffmpeg;

pub use self::ffmpeg::Ffmpeg;
use crate::error::Result;
use crate::models::Event;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Shared handle to a subtitle source.
pub type SourceHandle = Arc<dyn SubtitleSource>;

/// Extracts raw subtitle events from a single media file.
#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Name of the source, used for logging only.
    fn name(&self) -> &str;

    /// Extract every text-track event of the media file at `path` (absolute),
    /// in the order the file declares them.
    ///
    /// Timestamps are reported in milliseconds. Failure to extract is
    /// reported as an error; a file with an empty text track is not a failure.
    async fn events(&self, path: &Path) -> Result<Vec<Event>>;
}
