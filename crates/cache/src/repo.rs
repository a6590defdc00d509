//! Repository for cached subtitles.
//!
//! The scanner is the only writer; everything else only ever reads. Reads
//! issued while a scan is running see whatever has been committed so far,
//! which is the accepted (and documented) eventual consistency of the cache.

use crate::Database;
use crate::Subtitle;
use crate::error::{ErrorKind, Result};
use crate::models::SubtitleRow;
use exn::ResultExt;
use sqlx::SqlitePool;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// How subtitle text is matched against a search string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextMatch {
    /// ASCII case-insensitive containment (SQLite `LIKE` semantics).
    #[default]
    CaseInsensitive,
    /// Exact, byte-for-byte containment.
    CaseSensitive,
}
impl From<bool> for TextMatch {
    fn from(case_sensitive: bool) -> Self {
        match case_sensitive {
            true => Self::CaseSensitive,
            false => Self::CaseInsensitive,
        }
    }
}
impl Display for TextMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::CaseInsensitive => write!(f, "case-insensitive"),
            Self::CaseSensitive => write!(f, "case-sensitive"),
        }
    }
}

/// Escape `LIKE` wildcards so the needle is matched literally (`ESCAPE '\'`).
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for managing cached [`Subtitle`] entries.
///
/// # Identity
///
/// - Each subtitle is identified by its deterministic `id`; writing the same
///   subtitle twice replaces the first row rather than duplicating it.
/// - Subtitles are grouped by `video_id`, the media file's path relative to
///   the library root. A video is "cached" once any of its subtitles exist.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    text_match: TextMatch,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone(), TextMatch::default())
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool, text_match: TextMatch) -> Self {
        Self { pool, text_match }
    }

    /// Change how [`find_by_prefix_and_text`](Self::find_by_prefix_and_text)
    /// matches subtitle text.
    pub fn with_text_match(mut self, text_match: TextMatch) -> Self {
        self.text_match = text_match;
        self
    }

    pub fn text_match(&self) -> TextMatch {
        self.text_match
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Insert a subtitle, replacing any existing subtitle with the same id.
    ///
    /// Idempotent: putting the same subtitle any number of times leaves
    /// exactly one row. The write is visible to every read issued after this
    /// returns.
    pub async fn put(&self, subtitle: &Subtitle) -> Result<()> {
        let row = SubtitleRow::try_from(subtitle)?;
        Self::upsert(row).execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Insert all subtitles of one extraction in a single transaction.
    ///
    /// Either every subtitle is written or none are, so a failed write never
    /// leaves a media file looking cached with only part of its subtitles.
    pub async fn put_all(&self, subtitles: &[Subtitle]) -> Result<()> {
        let rows = subtitles.iter().map(SubtitleRow::try_from).collect::<Result<Vec<_>>>()?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            Self::upsert(row).execute(&mut *tx).await.or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    fn upsert(row: SubtitleRow) -> sqlx::query::Query<'static, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'static>> {
        sqlx::query(include_str!("../queries/upsert_subtitle.sql"))
            .bind(row.subtitle_id)
            .bind(row.video_id)
            .bind(row.text)
            .bind(row.start)
            .bind(row.end)
    }

    // =========================================================================
    // Existence
    // =========================================================================

    /// Returns `true` if at least one subtitle is cached for the video.
    ///
    /// This is what the scanner uses to skip re-extraction. A video whose
    /// extraction failed (or that has no subtitles at all) is never cached,
    /// and will be extracted again by the next scan.
    pub async fn has(&self, video_id: impl AsRef<str>) -> Result<bool> {
        let exists: i64 = sqlx::query_scalar(include_str!("../queries/has_video.sql"))
            .bind(video_id.as_ref())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(exists != 0)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get a subtitle by its id. A miss is `Ok(None)`, not an error.
    pub async fn find_by_id(&self, id: impl AsRef<str>) -> Result<Option<Subtitle>> {
        let row: Option<SubtitleRow> = sqlx::query_as(include_str!("../queries/get_by_id.sql"))
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(Subtitle::from))
    }

    /// Find every subtitle whose video id starts with `prefix` and whose text
    /// contains `text` (according to the repository's [`TextMatch`]).
    ///
    /// An empty prefix matches every video and empty text matches every
    /// subtitle. The prefix is matched literally and case-sensitively. The
    /// order of the results is unspecified; callers impose their own.
    pub async fn find_by_prefix_and_text(&self, prefix: impl AsRef<str>, text: impl AsRef<str>) -> Result<Vec<Subtitle>> {
        let (query, needle) = match self.text_match {
            TextMatch::CaseInsensitive => {
                (include_str!("../queries/find_by_prefix_and_text.sql"), escape_like(text.as_ref()))
            },
            TextMatch::CaseSensitive => {
                (include_str!("../queries/find_by_prefix_and_text_cs.sql"), text.as_ref().to_string())
            },
        };
        let rows: Vec<SubtitleRow> = sqlx::query_as(query)
            .bind(prefix.as_ref())
            .bind(needle)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Subtitle::from).collect())
    }

    /// List every subtitle of one video, ordered by start time.
    pub async fn list_by_video(&self, video_id: impl AsRef<str>) -> Result<Vec<Subtitle>> {
        let rows: Vec<SubtitleRow> = sqlx::query_as(include_str!("../queries/list_by_video.sql"))
            .bind(video_id.as_ref())
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Subtitle::from).collect())
    }

    // =========================================================================
    // Counts
    // =========================================================================

    /// Count the total number of cached subtitles.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_subtitles.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("subtitle count"))
    }

    /// Count the number of distinct cached videos.
    pub async fn count_videos(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_videos.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("video count"))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Forget every subtitle of a video, so that the next scan extracts it
    /// again.
    ///
    /// Returns the number of subtitles deleted.
    pub async fn delete_by_video(&self, video_id: impl AsRef<str>) -> Result<u64> {
        let result = sqlx::query(include_str!("../queries/delete_by_video.sql"))
            .bind(video_id.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }
}
