//! Clip requests and their validation.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Longest clip that may be rendered, in seconds.
pub const MAX_DURATION: f64 = 10.0;
/// Smallest and largest output width, in pixels.
pub const RESOLUTION_RANGE: std::ops::RangeInclusive<u32> = 50..=1024;
/// Longest overlay text or caption, in characters.
pub const MAX_TEXT_LENGTH: usize = 200;
pub const MAX_FONT_SIZE: u32 = 50;

/// Encoded image format of a rendered clip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum OutputFormat {
    Gif,
    #[default]
    Webp,
}
impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}
impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}
impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::Webp),
            _ => Err(s.to_string()),
        }
    }
}

/// Everything needed to render a short clip of one media file.
///
/// Built per request from untrusted input, so nothing about it is assumed
/// valid until [`validate`](Self::validate) says so.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct ClipRequest {
    /// Start time, in seconds.
    pub start: f64,
    /// End time, in seconds.
    pub end: f64,
    /// Text burnt into the bottom of the clip (usually the subtitle line).
    pub text: String,
    /// Text burnt into the top of the clip.
    pub caption: String,
    /// Crop to a centred square before scaling.
    pub crop: bool,
    /// Play forwards then backwards.
    pub boomerang: bool,
    /// Boost saturation and contrast.
    pub colour: bool,
    /// Output width in pixels; the height follows the aspect ratio.
    pub resolution: u32,
    pub font_size: u32,
    /// Requested output format, as given. Parsed during validation.
    pub format: String,
    /// Relative path of the source media file.
    pub video_id: String,
    /// The subtitle this clip was requested from, if any.
    pub subtitle_id: Option<String>,
}
impl Default for ClipRequest {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.0,
            text: String::new(),
            caption: String::new(),
            crop: false,
            boomerang: false,
            colour: false,
            resolution: 500,
            font_size: 20,
            format: OutputFormat::default().to_string(),
            video_id: String::new(),
            subtitle_id: None,
        }
    }
}
impl ClipRequest {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check every field, collecting one message per offending field.
    ///
    /// On success, returns the parsed output format.
    pub fn validate(&self) -> Result<OutputFormat, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if !(self.start.is_finite() && self.end.is_finite()) || self.start < 0.0 {
            errors.insert("start", "start and end must be valid times");
        } else if self.end <= self.start {
            errors.insert("end", "end time must be after start time");
        } else if self.duration() > MAX_DURATION {
            errors.insert("end", "clip too long");
        }
        if !RESOLUTION_RANGE.contains(&self.resolution) {
            errors.insert(
                "resolution",
                format!("resolution must be between {} and {}", RESOLUTION_RANGE.start(), RESOLUTION_RANGE.end()),
            );
        }
        if self.video_id.is_empty() {
            errors.insert("video", "invalid video id");
        }
        if self.text.chars().count() > MAX_TEXT_LENGTH {
            errors.insert("text", "subtitle text too large");
        }
        if self.caption.chars().count() > MAX_TEXT_LENGTH {
            errors.insert("caption", "caption too large");
        }
        if self.font_size > MAX_FONT_SIZE {
            errors.insert("font_size", "font size too large");
        }
        let format = self.format.parse::<OutputFormat>();
        if format.is_err() {
            errors.insert("format", "invalid output format, only gif and webp are allowed");
        }
        match (errors.is_empty(), format) {
            (true, Ok(format)) => Ok(format),
            _ => Err(errors),
        }
    }
}

/// Field-level validation failures, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(&'static str, String)>);
impl ValidationErrors {
    /// Record a failure. A later failure for the same field replaces the
    /// earlier one.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        let message = message.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = message,
            None => self.0.push((field, message)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}
impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}
