use crate::error::{ErrorKind, Result};
use std::path::PathBuf;

/// Locate the `ffmpeg` executable: an explicit path wins, otherwise the
/// `PATH` is searched.
pub(crate) fn discover(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return match which::which(&path) {
            Ok(path) => Ok(path),
            Err(_) => {
                tracing::warn!(ffmpeg = %path.display(), "Configured ffmpeg executable is not usable");
                exn::bail!(ErrorKind::ToolNotFound)
            },
        };
    }
    match which::which("ffmpeg") {
        Ok(path) => {
            tracing::debug!(ffmpeg = %path.display(), "Discovered ffmpeg executable");
            Ok(path)
        },
        Err(_) => {
            tracing::info!("ffmpeg executable not found in PATH");
            exn::bail!(ErrorKind::ToolNotFound)
        },
    }
}
