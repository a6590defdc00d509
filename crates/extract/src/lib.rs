//! Subtitle extraction for media files.
//!
//! Wraps an external [`SubtitleSource`] (by default [`Ffmpeg`]) and
//! normalizes its output into [`Subtitle`] records that are ready to be
//! cached: deterministic identifiers, owning file, and timings in seconds.

mod consts;
pub mod error;
mod markup;
pub mod models;
mod source;
mod srt;

use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
pub use crate::markup::strip_markup;
use crate::models::Subtitle;
pub use crate::source::{Ffmpeg, SourceHandle, SubtitleSource};
pub use crate::srt::parse_srt;

/// Easy, top-level entrypoint for the extraction of every [`Subtitle`] of a
/// media file.
///
/// - `path` is the absolute location of the media file, handed to the source.
/// - `video_id` is the file's path relative to the library root, which every
///   record is attributed to and which seeds the deterministic identifiers.
///
/// Either every event is converted, or an error is returned: the caller never
/// receives a partial record set for a failed extraction.
#[instrument(skip(source), fields(source = source.name()))]
pub async fn extract(source: &dyn SubtitleSource, path: &Path, video_id: &str) -> Result<Vec<Subtitle>> {
    let events = source.events(path).await.or_raise(|| ErrorKind::Failed {
        file: path.to_path_buf(),
        reason: format!("{} could not extract subtitles", source.name()),
    })?;
    Ok(events.into_iter().enumerate().map(|(index, event)| Subtitle::from_event(video_id, index, event)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, subtitle_id};
    use async_trait::async_trait;

    struct Fixed(Option<Vec<Event>>);

    #[async_trait]
    impl SubtitleSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn events(&self, path: &Path) -> Result<Vec<Event>> {
            match &self.0 {
                Some(events) => Ok(events.clone()),
                None => exn::bail!(ErrorKind::Failed {
                    file: path.to_path_buf(),
                    reason: "no subtitle stream".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_extract_assigns_ids_and_seconds() {
        let source = Fixed(Some(vec![
            Event::new(1000.0, 2000.0, "first"),
            Event::new(2500.0, 3000.0, "second"),
        ]));
        let subtitles = extract(&source, Path::new("/media/show/ep1.mkv"), "show/ep1.mkv").await.unwrap();
        assert_eq!(subtitles.len(), 2);
        assert_eq!(subtitles[0].id, subtitle_id("show/ep1.mkv", 0));
        assert_eq!(subtitles[1].id, subtitle_id("show/ep1.mkv", 1));
        assert_eq!(subtitles[1].start, 2.5);
        assert!(subtitles.iter().all(|s| s.video_id == "show/ep1.mkv"));
    }

    #[tokio::test]
    async fn test_extract_is_stable_across_runs() {
        let source = Fixed(Some(vec![Event::new(0.0, 1.0, "a"), Event::new(1.0, 2.0, "b")]));
        let first = extract(&source, Path::new("/m/a.mkv"), "a.mkv").await.unwrap();
        let second = extract(&source, Path::new("/m/a.mkv"), "a.mkv").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_extract_failure() {
        let source = Fixed(None);
        let err = extract(&source, Path::new("/media/broken.mkv"), "broken.mkv").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Failed { file, .. } if file == Path::new("/media/broken.mkv")));
    }

    #[tokio::test]
    async fn test_empty_track_is_not_a_failure() {
        let source = Fixed(Some(vec![]));
        let subtitles = extract(&source, Path::new("/media/silent.mkv"), "silent.mkv").await.unwrap();
        assert!(subtitles.is_empty());
    }
}
