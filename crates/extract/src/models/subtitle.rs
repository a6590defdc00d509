use super::Event;
use std::cmp::Ordering;

/// Derive the stable identifier of the `index`-th event of a video.
///
/// The identifier is the hex-encoded UTF-8 bytes of `"{video_id}/{index}"`, so
/// the same event of the same file always maps to the same identifier across
/// rescans, as long as the extraction tool reports events in the same order.
pub fn subtitle_id(video_id: &str, index: usize) -> String {
    hex::encode(format!("{video_id}/{index}"))
}

/// One extracted subtitle line, belonging to a media file in the library.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subtitle {
    /// Globally unique, deterministic identifier (see [`subtitle_id`]).
    pub id: String,
    /// Path of the owning media file, relative to the library root (POSIX separators).
    pub video_id: String,
    /// Start time, in seconds.
    pub start: f64,
    /// End time, in seconds.
    pub end: f64,
    /// Plain text content, on a single line.
    pub text: String,
}
impl Subtitle {
    /// Build the subtitle record for the `index`-th event of `video_id`.
    pub fn from_event(video_id: impl Into<String>, index: usize, event: Event) -> Self {
        let video_id = video_id.into();
        Self {
            id: subtitle_id(&video_id, index),
            start: event.start / 1000.0,
            end: event.end / 1000.0,
            text: event.text,
            video_id,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Display ordering: by owning file, then by start time.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.video_id.cmp(&other.video_id).then_with(|| self.start.total_cmp(&other.start))
    }
}
