use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single raw text-track event as reported by a [`SubtitleSource`](crate::SubtitleSource).
///
/// Timestamps are in milliseconds, as emitted by the extraction tool. They are
/// converted to seconds when the event is turned into a [`Subtitle`](super::Subtitle).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub start: f64,
    pub end: f64,
    pub text: String,
}
impl Event {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self { start, end, text: text.into() }
    }
}
impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}ms -> {}ms] {}", self.start, self.end, self.text)
    }
}
