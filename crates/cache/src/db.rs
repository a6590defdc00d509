//! Connection pool of the subtitle cache.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
/// Value of a cache location that selects the in-memory database.
pub const IN_MEMORY: &str = ":memory:";
// The scanner writes on one connection while queries read on the others.
const FILE_CONNECTIONS: u32 = 4;
// A search over a large library can hold a read snapshot for a while.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Gone when the process exits; for ephemeral deployments and tests.
    Memory,
}
impl From<Option<&Path>> for Location {
    fn from(path: Option<&Path>) -> Self {
        match path {
            Some(path) if !path.as_os_str().is_empty() && path.as_os_str() != IN_MEMORY => Self::File(path.to_path_buf()),
            _ => Self::Memory,
        }
    }
}
impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str("in-memory"),
        }
    }
}

/// The cache database, with its schema migrated to the current version.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    location: Location,
}

impl Database {
    /// Open the cache at `path`, or an in-memory cache if there is no path
    /// (or it is `":memory:"`).
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        Self::open_location(Location::from(path)).await
    }

    #[instrument(name = "open cache", skip_all, fields(location = %location))]
    pub async fn open_location(location: Location) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            // Readers never wait for the scanner's writes.
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);
        let (options, connections) = match &location {
            Location::File(path) => (options.filename(path).create_if_missing(true), FILE_CONNECTIONS),
            // Every connection to ":memory:" is a separate database, so the
            // pool must never open a second one.
            Location::Memory => (options.filename(IN_MEMORY), 1),
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(connections)
            // Pragmas set by query only apply to the connection they ran on.
            .after_connect(|conn, _| Box::pin(async move { Self::tune(conn).await }))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool, location };
        db.migrate().await?;
        tracing::debug!("Cache database ready");
        Ok(db)
    }

    /// Connect to the cache database file at `path`, creating it if needed.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_location(Location::File(path.as_ref().to_path_buf())).await
    }

    /// Connect to a fresh in-memory database.
    ///
    /// Not gated on `cfg(test)`: other crates use it in their tests too.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open_location(Location::Memory).await
    }

    async fn tune(conn: &mut SqliteConnection) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 1000;
                PRAGMA cache_size = -16384;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Wait for every connection to be returned, then close the pool.
    pub async fn close(&self) {
        // Refresh query planner statistics before going away.
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
