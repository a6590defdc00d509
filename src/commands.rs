//! Command handlers. Everything user-facing is printed to stdout; logs go to
//! stderr.

use crate::app::App;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::pin::pin;
use subclipper_extract::models::Subtitle;
use subclipper_library::{Page, ScanState};
use subclipper_render::{ClipRequest, OutputFormat};
use subclipper_storage::TreeNode;

/// Format seconds as `h:mm:ss.mmm` (hours omitted when zero).
pub fn timestamp(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    match hours {
        0 => format!("{minutes:02}:{secs:02}.{millis:03}"),
        _ => format!("{hours}:{minutes:02}:{secs:02}.{millis:03}"),
    }
}

pub fn subtitle_line(subtitle: &Subtitle) -> String {
    format!(
        "{} [{} -> {}] {}  ({})",
        subtitle.video_id,
        timestamp(subtitle.start),
        timestamp(subtitle.end),
        subtitle.text,
        subtitle.id
    )
}

pub fn tree_lines(node: &TreeNode) -> String {
    fn walk(node: &TreeNode, depth: usize, out: &mut String) {
        let name = match node.name() {
            "" => ".",
            name => name,
        };
        let suffix = if node.is_dir { "/" } else { "" };
        _ = writeln!(out, "{}{name}{suffix}", "  ".repeat(depth));
        for child in &node.children {
            walk(child, depth + 1, out);
        }
    }
    let mut out = String::new();
    walk(node, 0, &mut out);
    out
}

/// Run the scan to completion, printing progress as it arrives.
pub async fn scan(app: &App, quiet: bool) -> Result<()> {
    let mut progress = pin!(app.query.subscribe_progress(""));
    let Some(task) = app.start_scan() else {
        exn::bail!(ErrorKind::Command("no subtitle extraction tool available; install ffmpeg".to_string()));
    };
    if !quiet {
        while let Some(update) = progress.next().await {
            if let Some(fraction) = update {
                eprint!("\rScanning library: {:>5.1}%", fraction * 100.0);
                if fraction >= 1.0 {
                    eprintln!();
                    break;
                }
            }
        }
    }
    let summary = task.await.or_raise(|| ErrorKind::Command("library scan did not finish".to_string()))?;
    println!(
        "{} files: {} already cached, {} extracted, {} failed",
        summary.total, summary.cached, summary.processed, summary.failed
    );
    Ok(())
}

pub async fn status(app: &App) -> Result<()> {
    let cache_error = || ErrorKind::Command("could not read the subtitle cache".to_string());
    let subtitles = app.cache.count().await.or_raise(cache_error)?;
    let videos = app.cache.count_videos().await.or_raise(cache_error)?;
    println!("library:   {}", app.config.search_path.display());
    match app.config.cache_location() {
        Some(path) => println!("cache:     {}", path.display()),
        None => println!("cache:     in-memory"),
    }
    println!("cached:    {subtitles} subtitles from {videos} files");
    let state = app.scanner.state();
    if state != ScanState::NotStarted {
        println!("scan:      {state}");
    }
    Ok(())
}

/// Pages are numbered from one on the command line.
pub fn print_page(page: &Page) {
    for subtitle in &page.items {
        println!("{}", subtitle_line(subtitle));
    }
    match page.page_count() {
        0 => println!("no matching subtitles"),
        count => println!("page {} of {} ({} matches)", page.index + 1, count, page.total),
    }
}

pub async fn search(app: &App, prefix: &str, text: &str, page: usize, page_length: Option<usize>) -> Result<()> {
    let page = app
        .query
        .search(prefix, text, page, page_length)
        .await
        .or_raise(|| ErrorKind::Command("search failed".to_string()))?;
    print_page(&page);
    Ok(())
}

pub async fn locate(app: &App, id: &str, page_length: Option<usize>) -> Result<()> {
    let located = app
        .query
        .locate(id, page_length)
        .await
        .or_raise(|| ErrorKind::Command("lookup failed".to_string()))?;
    match located {
        Some(page) => println!("{}", page + 1),
        None => exn::bail!(ErrorKind::Command(format!("subtitle {id} not found"))),
    }
    Ok(())
}

pub async fn show(app: &App, id: Option<&str>, video: Option<&str>) -> Result<()> {
    let lookup_error = || ErrorKind::Command("lookup failed".to_string());
    if let Some(video) = video {
        let subtitles = app.query.video(video).await.or_raise(lookup_error)?;
        if subtitles.is_empty() {
            exn::bail!(ErrorKind::Command(format!("no subtitles cached for {video}")));
        }
        for subtitle in &subtitles {
            println!("{}", subtitle_line(subtitle));
        }
        return Ok(());
    }
    let Some(id) = id else {
        exn::bail!(ErrorKind::Command("either a subtitle id or --video is required".to_string()));
    };
    match app.query.get(id).await.or_raise(lookup_error)? {
        Some(subtitle) => println!("{}", subtitle_line(&subtitle)),
        None => exn::bail!(ErrorKind::Command(format!("subtitle {id} not found"))),
    }
    Ok(())
}

pub async fn tree(app: &App, subpath: &str) -> Result<()> {
    let tree = app
        .query
        .list_path(subpath)
        .await
        .or_raise(|| ErrorKind::Command("could not read the media library".to_string()))?;
    match tree {
        Some(tree) => print!("{}", tree_lines(&tree)),
        None => exn::bail!(ErrorKind::Command(format!("{subpath} not found in the media library"))),
    }
    Ok(())
}

pub async fn forget(app: &App, video: &str) -> Result<()> {
    let deleted = app
        .cache
        .delete_by_video(video)
        .await
        .or_raise(|| ErrorKind::Command("could not update the subtitle cache".to_string()))?;
    println!("forgot {deleted} subtitles of {video}");
    Ok(())
}

/// Options of the `clip` command that are not part of the request itself.
pub struct ClipTarget {
    pub subtitle: Option<String>,
    pub output: Option<PathBuf>,
}

pub async fn clip(app: &App, mut request: ClipRequest, target: ClipTarget) -> Result<()> {
    // Start from the subtitle's own timing and text, unless overridden.
    if let Some(id) = &target.subtitle {
        let subtitle = app
            .query
            .get(id)
            .await
            .or_raise(|| ErrorKind::Command("lookup failed".to_string()))?
            .ok_or_else(|| exn::Exn::from(ErrorKind::Command(format!("subtitle {id} not found"))))?;
        fill_from_subtitle(&mut request, &subtitle);
    }
    if let Err(errors) = request.validate() {
        for (field, message) in errors.iter() {
            eprintln!("{field}: {message}");
        }
        exn::bail!(ErrorKind::Command("invalid clip request".to_string()));
    }
    let source = app
        .backend
        .resolve(Path::new(&request.video_id))
        .or_raise(|| ErrorKind::Command(format!("{} is not in the media library", request.video_id)))?;
    let renderer = app.renderer()?;
    let rendered = tokio::task::spawn_blocking(move || renderer.render(&request, &source))
        .await
        .or_raise(|| ErrorKind::Command("clip rendering did not finish".to_string()))?
        .or_raise(|| ErrorKind::Command("clip rendering failed".to_string()))?;
    let output = target.output.unwrap_or_else(|| PathBuf::from(format!("clip.{}", rendered.format().extension())));
    let saved = rendered.persist(&output).or_raise(|| ErrorKind::Command(format!("could not save {}", output.display())))?;
    println!("{}", saved.display());
    Ok(())
}

fn fill_from_subtitle(request: &mut ClipRequest, subtitle: &Subtitle) {
    if request.video_id.is_empty() {
        request.video_id = subtitle.video_id.clone();
    }
    if request.end <= request.start {
        request.start = subtitle.start;
        request.end = subtitle.end;
    }
    if request.text.is_empty() {
        request.text = subtitle.text.clone();
    }
    request.subtitle_id = Some(subtitle.id.clone());
}

/// Parse `--format` eagerly so that typos are reported by the argument parser.
pub fn parse_format(value: &str) -> std::result::Result<String, String> {
    value
        .parse::<OutputFormat>()
        .map(|format| format.to_string())
        .map_err(|invalid| format!("unsupported format `{invalid}`, expected gif or webp"))
}
