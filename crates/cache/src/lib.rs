//! SQLite cache database for extracted subtitles.
//!
//! This crate provides the cache database that tracks every subtitle line
//! extracted from the media library. The database is not the source of truth,
//! the media files themselves are: if the database is deleted, it is rebuilt
//! by the next library scan (at the cost of re-extracting everything).
//!
//! # Architecture
//! The cache stores a single entity type, the [`Subtitle`], keyed by its
//! deterministic identifier and grouped by the relative path of the media
//! file it was extracted from (the `video_id`). A media file counts as
//! "cached" as soon as at least one of its subtitles is stored.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::{Database, IN_MEMORY, Location};
pub use crate::repo::{Repository, TextMatch};
pub(crate) use subclipper_extract::models::Subtitle;
