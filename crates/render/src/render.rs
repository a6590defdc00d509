use crate::error::{ErrorKind, Result};
use crate::{ClipRequest, OutputFormat, Renderer};
use exn::ResultExt;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::instrument;

/// Frame rate of every rendered clip.
pub const FPS: u32 = 20;

/// A rendered clip, living in its own temporary directory.
///
/// The directory (and the clip with it) is deleted when this is dropped,
/// unless the clip was [persisted](Self::persist) elsewhere first.
pub struct Output {
    dir: TempDir,
    path: PathBuf,
    format: OutputFormat,
}
impl Output {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Move the clip out of the temporary directory.
    pub fn persist(self, to: impl AsRef<Path>) -> Result<PathBuf> {
        let to = to.as_ref();
        // Falls back to a copy when `to` is on another file system.
        if fs::rename(&self.path, to).is_err() {
            fs::copy(&self.path, to).or_raise(|| ErrorKind::Io)?;
        }
        drop(self.dir);
        Ok(to.to_path_buf())
    }
}

/// Files that make up a single ffmpeg invocation.
struct Job<'a> {
    request: &'a ClipRequest,
    format: OutputFormat,
    source: &'a Path,
    font: Option<&'a Path>,
    text_file: Option<PathBuf>,
    caption_file: Option<PathBuf>,
    output: PathBuf,
}

impl Renderer {
    /// Render `request` from the media file at `source` (an absolute path).
    ///
    /// The request is validated first; an invalid request never reaches
    /// `ffmpeg` and fails with [`ErrorKind::Invalid`].
    #[instrument(skip(self, request), fields(video = %request.video_id, start = request.start, end = request.end))]
    pub fn render(&self, request: &ClipRequest, source: &Path) -> Result<Output> {
        let format = match request.validate() {
            Ok(format) => format,
            Err(errors) => exn::bail!(ErrorKind::Invalid(errors)),
        };
        let dir = tempfile::Builder::new().prefix("subclipper-").tempdir().or_raise(|| ErrorKind::Io)?;
        // Burnt-in text goes through files, which spares it a round of
        // filter-graph escaping.
        let text_file = write_text(dir.path(), "text.txt", &request.text)?;
        let caption_file = write_text(dir.path(), "caption.txt", &request.caption)?;
        let job = Job {
            request,
            format,
            source,
            font: self.font.as_deref(),
            text_file,
            caption_file,
            output: dir.path().join(format!("clip.{}", format.extension())),
        };
        let output = Command::new(&self.ffmpeg)
            .args(job.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .or_raise(|| ErrorKind::Io)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("ffmpeg exited with {}", output.status),
                message => message.lines().last().unwrap_or(message).to_string(),
            };
            exn::bail!(ErrorKind::Failed(message));
        }
        tracing::debug!(output = %job.output.display(), "Rendered clip");
        Ok(Output { path: job.output, dir, format })
    }
}

fn write_text(dir: &Path, name: &str, text: &str) -> Result<Option<PathBuf>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    let path = dir.join(name);
    fs::write(&path, text).or_raise(|| ErrorKind::Io)?;
    Ok(Some(path))
}

/// Escape a value for use inside a filter option, inside a filter graph.
fn escape(value: &str) -> String {
    let mut option = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option.push('\\');
        }
        option.push(c);
    }
    let mut graph = String::with_capacity(option.len());
    for c in option.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph.push('\\');
        }
        graph.push(c);
    }
    graph
}

impl Job<'_> {
    fn drawtext(&self, file: &Path, y: &str) -> String {
        let font = match self.font {
            Some(font) => format!("fontfile={}:", escape(&font.to_string_lossy())),
            None => String::new(),
        };
        format!(
            "drawtext={font}textfile={}:fontsize={}:fontcolor=white:borderw=2:bordercolor=black:x=(w-text_w)/2:y={y}",
            escape(&file.to_string_lossy()),
            self.request.font_size,
        )
    }

    fn filter_graph(&self) -> String {
        let resolution = self.request.resolution;
        let mut filters = vec![format!("fps={FPS}")];
        if self.request.crop {
            filters.push("crop='min(iw,ih)':'min(iw,ih)'".to_string());
            filters.push(format!("scale={resolution}:{resolution}"));
        } else {
            filters.push(format!("scale={resolution}:-2"));
        }
        if self.request.colour {
            filters.push("eq=saturation=1.8:contrast=1.15".to_string());
        }
        if let Some(file) = &self.caption_file {
            filters.push(self.drawtext(file, "10"));
        }
        if let Some(file) = &self.text_file {
            filters.push(self.drawtext(file, "h-text_h-10"));
        }
        let mut graph = format!("[0:v]{}", filters.join(","));
        if self.request.boomerang {
            graph.push_str("[fwd];[fwd]split[a][b];[b]reverse[r];[a][r]concat=n=2:v=1:a=0");
        }
        match self.format {
            OutputFormat::Gif => graph.push_str(",split[p0][p1];[p0]palettegen[p];[p1][p]paletteuse[out]"),
            OutputFormat::Webp => graph.push_str("[out]"),
        }
        graph
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-nostdin", "-hide_banner", "-loglevel", "error", "-y"]
            .into_iter()
            .map(Into::into)
            .collect();
        for arg in ["-ss".to_string(), format!("{:.3}", self.request.start), "-t".into(), format!("{:.3}", self.request.duration()), "-i".into()] {
            args.push(arg.into());
        }
        args.push(self.source.as_os_str().to_owned());
        for arg in ["-filter_complex".to_string(), self.filter_graph(), "-map".into(), "[out]".into(), "-an".into(), "-loop".into(), "0".into()] {
            args.push(arg.into());
        }
        if self.format == OutputFormat::Webp {
            for arg in ["-c:v", "libwebp", "-quality", "75"] {
                args.push(arg.into());
            }
        }
        args.push(self.output.as_os_str().to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ClipRequest {
        ClipRequest {
            start: 61.5,
            end: 64.0,
            text: "Hello there".to_string(),
            video_id: "Show/ep1.mkv".to_string(),
            resolution: 320,
            ..ClipRequest::default()
        }
    }

    fn job<'a>(request: &'a ClipRequest, format: OutputFormat) -> Job<'a> {
        Job {
            request,
            format,
            source: Path::new("/media/Show/ep1.mkv"),
            font: None,
            text_file: Some(PathBuf::from("/tmp/clip/text.txt")),
            caption_file: None,
            output: PathBuf::from(format!("/tmp/clip/clip.{}", format.extension())),
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_args_cut_and_encode() {
        let request = request();
        let args = strings(job(&request, OutputFormat::Webp).args());
        let at = |flag: &str| args[args.iter().position(|a| a == flag).unwrap() + 1].as_str();
        assert_eq!(at("-ss"), "61.500");
        assert_eq!(at("-t"), "2.500");
        assert_eq!(at("-i"), "/media/Show/ep1.mkv");
        assert_eq!(at("-map"), "[out]");
        assert_eq!(at("-c:v"), "libwebp");
        assert_eq!(args.last().unwrap(), "/tmp/clip/clip.webp");
    }

    #[test]
    fn test_plain_filter_graph() {
        let request = request();
        let graph = job(&request, OutputFormat::Webp).filter_graph();
        assert_eq!(
            graph,
            "[0:v]fps=20,scale=320:-2,drawtext=textfile=/tmp/clip/text.txt:fontsize=20:fontcolor=white:borderw=2:\
             bordercolor=black:x=(w-text_w)/2:y=h-text_h-10[out]"
        );
    }

    #[test]
    fn test_decorated_filter_graph() {
        let request = ClipRequest { crop: true, boomerang: true, colour: true, ..request() };
        let mut job = job(&request, OutputFormat::Gif);
        job.caption_file = Some(PathBuf::from("/tmp/clip/caption.txt"));
        let graph = job.filter_graph();
        assert!(graph.contains("crop='min(iw,ih)':'min(iw,ih)',scale=320:320"));
        assert!(graph.contains("eq=saturation="));
        assert!(graph.contains("textfile=/tmp/clip/caption.txt:fontsize=20:fontcolor=white:borderw=2:bordercolor=black:x=(w-text_w)/2:y=10"));
        assert!(graph.contains("reverse[r];[a][r]concat=n=2:v=1:a=0"));
        assert!(graph.ends_with("palettegen[p];[p1][p]paletteuse[out]"));
        // Caption is drawn before (underneath) the subtitle text.
        assert!(graph.find("caption.txt").unwrap() < graph.find("text.txt").unwrap());
        assert!(!strings(job.args()).contains(&"libwebp".to_string()));
    }

    #[test]
    fn test_font_path_is_escaped() {
        let request = request();
        let mut job = job(&request, OutputFormat::Webp);
        let font = PathBuf::from("C:/Fonts/It's,[odd].ttf");
        job.font = Some(&font);
        let graph = job.filter_graph();
        assert!(graph.contains(r"fontfile=C\\:/Fonts/It\\\'s\,\[odd\].ttf:"), "{graph}");
    }

    #[test]
    fn test_invalid_request_is_rejected_before_ffmpeg() {
        let renderer = Renderer { ffmpeg: PathBuf::from("/definitely/not/a/real/ffmpeg"), font: None };
        let request = ClipRequest { end: 100.0, ..request() };
        let err = renderer.render(&request, Path::new("/media/Show/ep1.mkv")).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Invalid(errors) if errors.get("end") == Some("clip too long")));
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let renderer = Renderer { ffmpeg: PathBuf::from("/definitely/not/a/real/ffmpeg"), font: None };
        let err = renderer.render(&request(), Path::new("/media/Show/ep1.mkv")).err().unwrap();
        assert!(matches!(&*err, ErrorKind::Io));
    }

    #[test]
    fn test_blank_text_is_not_drawn() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(write_text(dir.path(), "text.txt", "   ").unwrap(), None);
        let path = write_text(dir.path(), "text.txt", " hi ").unwrap().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hi");
    }
}
