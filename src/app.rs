//! Composition root: builds every component exactly once and wires them up.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::sync::Arc;
use subclipper_cache::{Database, Repository, TextMatch};
use subclipper_config::Config;
use subclipper_extract::{Ffmpeg, SourceHandle};
use subclipper_library::{QueryService, Scanner, ScannerHandle};
use subclipper_render::Renderer;
use subclipper_storage::BackendHandle;
use subclipper_storage::backend::LocalBackend;
use tokio::task::JoinHandle;

pub struct App {
    pub config: Config,
    db: Database,
    pub cache: Repository,
    pub backend: BackendHandle,
    pub scanner: ScannerHandle,
    pub query: QueryService,
    /// Whether an extraction tool is available; without one there is nothing
    /// a scan could do.
    can_scan: bool,
}
impl App {
    pub async fn build(config: Config) -> Result<Self> {
        let backend: BackendHandle = Arc::new(
            LocalBackend::new("library", &config.search_path).or_raise(|| ErrorKind::Startup("media library"))?,
        );
        let db = Database::open(config.cache_location()).await.or_raise(|| ErrorKind::Startup("subtitle cache"))?;
        let cache = Repository::new(db.pool().clone(), TextMatch::from(config.case_sensitive));
        let discovered = match &config.ffmpeg {
            Some(path) => Ok(Ffmpeg::new(path)),
            None => Ffmpeg::discover(),
        };
        let (ffmpeg, can_scan) = match discovered {
            Ok(ffmpeg) => (ffmpeg, true),
            Err(error) => {
                tracing::warn!(?error, "Scanning is disabled; searching the existing cache only");
                (Ffmpeg::new("ffmpeg"), false)
            },
        };
        let source: SourceHandle = Arc::new(ffmpeg);
        let scanner = Scanner::handle(backend.clone(), cache.clone(), source);
        let query = QueryService::new(backend.clone(), cache.clone(), scanner.clone(), config.default_page_length);
        tracing::info!(
            library = %config.search_path.display(),
            cache = %db.location(),
            text_match = %cache.text_match(),
            "Ready"
        );
        Ok(Self { config, db, cache, backend, scanner, query, can_scan })
    }

    /// Start the one library scan of this process in the background.
    pub fn start_scan(&self) -> Option<JoinHandle<subclipper_library::ScanSummary>> {
        if !self.can_scan {
            return None;
        }
        self.scanner.start()
    }

    pub fn renderer(&self) -> Result<Renderer> {
        Renderer::new(self.config.ffmpeg.clone(), self.config.font_path.clone()).or_raise(|| ErrorKind::Startup("renderer"))
    }

    /// Stop the background scan, then close the cache.
    pub async fn close(&self) {
        self.scanner.stop().await;
        self.db.close().await;
    }
}
