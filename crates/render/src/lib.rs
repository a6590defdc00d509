//! Rendering of short, looping image clips from media files.
//!
//! A [`ClipRequest`] is validated field by field (see
//! [`ClipRequest::validate`]) and then handed to the [`Renderer`], which cuts,
//! decorates and encodes the clip with `ffmpeg` into a temporary directory.

mod clip;
pub mod error;
mod ffmpeg;
mod render;

pub use crate::clip::{ClipRequest, MAX_DURATION, OutputFormat, ValidationErrors};
use crate::error::Result;
pub use crate::render::{FPS, Output};
use std::path::{Path, PathBuf};

pub struct Renderer {
    ffmpeg: PathBuf,
    font: Option<PathBuf>,
}
impl Renderer {
    /// Use the given (or discovered) `ffmpeg`, and the given font for burnt-in
    /// text. Without a font, `ffmpeg`'s default font is used.
    pub fn new(ffmpeg: Option<PathBuf>, font: Option<PathBuf>) -> Result<Self> {
        Ok(Self { ffmpeg: ffmpeg::discover(ffmpeg)?, font })
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }
}
