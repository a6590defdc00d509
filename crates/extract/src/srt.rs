//! SubRip (SRT) parsing.
//!
//! `ffmpeg` can transcode any text-based subtitle stream (SRT, ASS/SSA,
//! mov_text, WebVTT) into SRT, which makes it the lowest common denominator
//! we parse subtitle events from.

use crate::consts::TIMING_REGEX;
use crate::error::{ErrorKind, Result};
use crate::markup::strip_markup;
use crate::models::Event;
use regex::Captures;

/// Parse an SRT document into events, in document order.
///
/// Blocks without a valid timing line are skipped (and logged), as are
/// events whose text is empty once styling markup has been stripped.
pub fn parse_srt(document: &str) -> Vec<Event> {
    let document = document.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut events = Vec::new();
    for block in document.split("\n\n") {
        let mut lines = block.lines().skip_while(|l| l.trim().is_empty());
        let Some(mut line) = lines.next() else {
            continue;
        };
        // The numeric counter is optional in the wild.
        if !line.contains("-->") {
            match lines.next() {
                Some(next) => line = next,
                None => continue,
            }
        }
        let (start, end) = match parse_timing(line) {
            Ok(timing) => timing,
            Err(e) => {
                tracing::debug!(line = line, error = ?e, "Skipping SRT block with invalid timing");
                continue;
            },
        };
        let text = strip_markup(&lines.collect::<Vec<_>>().join("\n"));
        if text.is_empty() {
            continue;
        }
        events.push(Event::new(start, end, text));
    }
    events
}

/// Parse an SRT timing line into `(start, end)` milliseconds.
fn parse_timing(line: &str) -> Result<(f64, f64)> {
    let Some(captures) = TIMING_REGEX.captures(line) else {
        exn::bail!(ErrorKind::ParseError {
            field: "timing",
            value: line.to_string(),
        });
    };
    Ok((timestamp(&captures, 1)?, timestamp(&captures, 5)?))
}

fn timestamp(captures: &Captures<'_>, offset: usize) -> Result<f64> {
    let group = |i: usize| -> Result<u64> {
        let value = captures.get(offset + i).map(|m| m.as_str()).unwrap_or_default();
        value.parse::<u64>().map_err(|_| {
            exn::Exn::from(ErrorKind::ParseError {
                field: "timestamp",
                value: value.to_string(),
            })
        })
    };
    let (hours, minutes, seconds) = (group(0)?, group(1)?, group(2)?);
    // Fractions shorter than three digits are fractions, not milliseconds: ",5" is 500ms.
    let fraction = captures.get(offset + 3).map(|m| m.as_str()).unwrap_or_default();
    let millis = group(3)? * 10u64.pow(3u32.saturating_sub(fraction.len() as u32));
    let total = hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|m| m.checked_add(seconds))
        .and_then(|s| s.checked_mul(1000))
        .and_then(|s| s.checked_add(millis));
    match total {
        Some(total) => Ok(total as f64),
        None => exn::bail!(ErrorKind::ParseError {
            field: "timestamp",
            value: captures.get(offset).map(|m| m.as_str()).unwrap_or_default().to_string(),
        }),
    }
}
