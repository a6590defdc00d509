use crate::error::{ErrorKind, Result};
use crate::models::Event;
use crate::source::SubtitleSource;
use crate::srt::parse_srt;
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// Extracts the first subtitle stream of a media file with `ffmpeg`.
///
/// The stream is transcoded to SubRip on standard output and parsed from
/// there, so any text-based subtitle codec `ffmpeg` understands is supported.
/// Bitmap subtitles (PGS, VobSub) cannot be converted and are reported as a
/// failed extraction.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    stream: usize,
}
impl Ffmpeg {
    /// Use the `ffmpeg` executable at the given path.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), stream: 0 }
    }

    /// Find `ffmpeg` on the `PATH`.
    pub fn discover() -> Result<Self> {
        match which::which("ffmpeg") {
            Ok(path) => {
                tracing::debug!(ffmpeg = %path.display(), "Discovered ffmpeg executable");
                Ok(Self::new(path))
            },
            Err(_) => exn::bail!(ErrorKind::ToolNotFound),
        }
    }

    /// Select which subtitle stream (zero-based, among subtitle streams only)
    /// to extract. Defaults to the first.
    pub fn with_stream(mut self, stream: usize) -> Self {
        self.stream = stream;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = ["-nostdin", "-hide_banner", "-loglevel", "error", "-i"]
            .into_iter()
            .map(Into::into)
            .collect();
        args.push(path.as_os_str().to_owned());
        for arg in ["-map".to_string(), format!("0:s:{}", self.stream), "-f".into(), "srt".into(), "-".into()] {
            args.push(arg.into());
        }
        args
    }
}

#[async_trait]
impl SubtitleSource for Ffmpeg {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn events(&self, path: &Path) -> Result<Vec<Event>> {
        let output = Command::new(&self.binary)
            .args(self.args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match stderr.trim() {
                "" => format!("ffmpeg exited with {}", output.status),
                message => message.lines().last().unwrap_or(message).to_string(),
            };
            exn::bail!(ErrorKind::Failed {
                file: path.to_path_buf(),
                reason,
            });
        }
        let events = parse_srt(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(events = events.len(), "Extracted subtitle events");
        Ok(events)
    }
}
