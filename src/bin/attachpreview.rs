//! CLI binary for attachment-preview.
//!
//! A thin shim over the library crate: maps CLI flags to `PreviewConfig`,
//! runs the pipeline on one message file and writes or prints what the
//! display surface would have received.

use anyhow::{Context, Result};
use attachment_preview::pipeline::encode::decode_data_url;
use attachment_preview::{
    BoxSize, CompletionMode, EmlDirectorySource, FileOpener, FullViewRequest, MessageId,
    PdfiumBackend, PreviewConfig, PreviewPipeline, PreviewUnit, RunReport, SurfaceNotice,
    SystemOpener,
};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Thumbnails of every PDF/image attachment into ./previews
  attachpreview mail/invoice.eml -o previews

  # Same message, addressed relative to a mail directory
  attachpreview --root mail inbox/invoice.eml -o previews

  # JSON lines, one per notice (data URLs included)
  attachpreview --json mail/invoice.eml

  # Five thumbnails per PDF in a bigger box
  attachpreview --max-pages 5 --box 200x300 mail/invoice.eml -o previews

  # Full view of page 2 of attachment 1, opened in the default viewer
  attachpreview mail/invoice.eml --full-view 1:2 -o previews --open

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise the system library is used)
  ATTACHPREVIEW_*         Every flag can also be set from the environment
  RUST_LOG                Override the log filter
"#;

/// Render inline previews of the attachments of an email message.
#[derive(Parser, Debug)]
#[command(
    name = "attachpreview",
    version,
    about = "Render inline previews of email attachments",
    long_about = "Lists the attachments of an .eml message, renders the first pages of every PDF \
as JPEG thumbnails and passes images through, exactly as a message pane would receive them.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Message file, or a path relative to --root.
    message: PathBuf,

    /// Directory messages are addressed from.
    #[arg(long, env = "ATTACHPREVIEW_ROOT")]
    root: Option<PathBuf>,

    /// Write preview images into this directory.
    #[arg(short, long, env = "ATTACHPREVIEW_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Print every notice as a JSON line on stdout.
    #[arg(long, env = "ATTACHPREVIEW_JSON")]
    json: bool,

    /// Thumbnails per PDF attachment.
    #[arg(long, env = "ATTACHPREVIEW_MAX_PAGES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: u32,

    /// Thumbnail box, WIDTHxHEIGHT.
    #[arg(long = "box", env = "ATTACHPREVIEW_BOX", default_value = "160x240", value_parser = parse_box)]
    thumbnail_box: BoxSize,

    /// Full-view box, WIDTHxHEIGHT.
    #[arg(long, env = "ATTACHPREVIEW_FULL_BOX", default_value = "600x900", value_parser = parse_box)]
    full_box: BoxSize,

    /// JPEG quality (1–100).
    #[arg(long, env = "ATTACHPREVIEW_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Per-attachment render timeout in seconds.
    #[arg(long, env = "ATTACHPREVIEW_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// When to send the completion notice.
    #[arg(long, env = "ATTACHPREVIEW_COMPLETION", value_enum, default_value = "after-renders")]
    completion: CompletionArg,

    /// Bounded notice queue size.
    #[arg(long, env = "ATTACHPREVIEW_CAPACITY", default_value_t = 32)]
    capacity: usize,

    /// Show one attachment in full instead: PART or PART:PAGE.
    #[arg(long, value_name = "PART[:PAGE]")]
    full_view: Option<String>,

    /// Open the written full view with the default application.
    #[arg(long, requires = "full_view")]
    open: bool,

    /// pdfium library to load.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable the spinner.
    #[arg(long, env = "ATTACHPREVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ATTACHPREVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ATTACHPREVIEW_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CompletionArg {
    AfterRenders,
    AfterScan,
}

impl From<CompletionArg> for CompletionMode {
    fn from(v: CompletionArg) -> Self {
        match v {
            CompletionArg::AfterRenders => CompletionMode::AfterRenders,
            CompletionArg::AfterScan => CompletionMode::AfterScan,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers progress; library INFO logs would only garble it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let (root, message) = resolve_message(&cli)?;
    let backend = match &cli.pdfium_lib {
        Some(path) => PdfiumBackend::new(Some(path.clone())),
        None => PdfiumBackend::from_env(),
    };
    let pipeline = PreviewPipeline::new(
        Arc::new(EmlDirectorySource::new(root)),
        Arc::new(backend),
        config,
    );

    if let Some(ref target) = cli.full_view {
        return full_view(&cli, &pipeline, message, target).await;
    }

    if let Some(ref dir) = cli.out_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Previewing");
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let (mut notices, run) = pipeline.preview_stream(message);
    let mut written = 0usize;
    while let Some(notice) = notices.next().await {
        if cli.json {
            println!(
                "{}",
                serde_json::to_string(&notice).context("Failed to serialise notice")?
            );
        }
        match notice {
            SurfaceNotice::Placeholder => {
                if let Some(ref bar) = spinner {
                    bar.inc_length(1);
                }
            }
            SurfaceNotice::Preview(unit) => {
                let line = match cli.out_dir {
                    Some(ref dir) => {
                        let path = write_unit(dir, &unit).await?;
                        written += 1;
                        path.display().to_string()
                    }
                    None => format!("{} bytes", unit.image.len()),
                };
                if !cli.quiet && !cli.json {
                    let msg = format!("  {} {:<12} {}", green("✓"), label(&unit), dim(&line));
                    match spinner {
                        Some(ref bar) => bar.println(msg),
                        None => eprintln!("{msg}"),
                    }
                }
            }
            SurfaceNotice::Completion(done) => {
                if let Some(ref bar) = spinner {
                    bar.set_message(format!("{} previews, finishing", done.previews_delivered));
                }
            }
        }
    }

    let report = run.await.context("Preview task failed")?;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, written, cli.out_dir.as_deref());
    }
    Ok(())
}

/// Map CLI args to `PreviewConfig`.
fn build_config(cli: &Cli) -> Result<PreviewConfig> {
    PreviewConfig::builder()
        .max_preview_pages(cli.max_pages)
        .thumbnail_box(cli.thumbnail_box)
        .full_view_box(cli.full_box)
        .jpeg_quality(cli.jpeg_quality)
        .render_timeout_secs(cli.timeout)
        .channel_capacity(cli.capacity)
        .completion(cli.completion.into())
        .build()
        .context("Invalid configuration")
}

/// Split the message argument into a source root and a message id.
fn resolve_message(cli: &Cli) -> Result<(PathBuf, MessageId)> {
    if let Some(ref root) = cli.root {
        return Ok((root.clone(), MessageId::new(cli.message.to_string_lossy())));
    }
    let name = cli
        .message
        .file_name()
        .with_context(|| format!("Not a message file: {}", cli.message.display()))?;
    let root = match cli.message.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, MessageId::new(name.to_string_lossy())))
}

/// Parse `WIDTHxHEIGHT`.
fn parse_box(s: &str) -> Result<BoxSize, String> {
    let (w, h) = s
        .trim()
        .to_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().to_string(), h.trim().to_string()))
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: u32 = h.parse().map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("box must be non-empty, got '{s}'"));
    }
    Ok(BoxSize::new(width, height))
}

/// Parse `--full-view` as `PART` or `PART:PAGE`.
fn parse_full_view(target: &str, message: MessageId) -> Result<FullViewRequest> {
    if target.contains('=') {
        return FullViewRequest::from_query(target).context("Invalid full-view query");
    }
    let (part, page) = match target.split_once(':') {
        Some((part, page)) => {
            let page: u32 = page
                .trim()
                .parse()
                .with_context(|| format!("Invalid page number: '{}'", page.trim()))?;
            (part.trim(), Some(page))
        }
        None => (target.trim(), None),
    };
    if part.is_empty() {
        anyhow::bail!("--full-view needs an attachment part name");
    }
    Ok(FullViewRequest::new(message, part, page))
}

async fn full_view(cli: &Cli, pipeline: &PreviewPipeline, message: MessageId, target: &str) -> Result<()> {
    let request = parse_full_view(target, message)?;
    let view = pipeline
        .open_full_view(&request)
        .await
        .context("Full view failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&view).context("Failed to serialise full view")?
        );
    }

    let Some(ref dir) = cli.out_dir else {
        if !cli.json && !cli.quiet {
            eprintln!(
                "{} {}x{} popup, {} bytes  {}",
                cyan("◆"),
                view.window.width,
                view.window.height,
                view.image.len(),
                dim(&view.window.query)
            );
        }
        return Ok(());
    };

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let (mime, bytes) = decode_data_url(&view.image).context("Full view is not a data URL")?;
    let stem = match request.page_number {
        Some(page) => format!("full-{}-p{}", sanitize(&request.part_name), page),
        None => format!("full-{}", sanitize(&request.part_name)),
    };
    let path = dir.join(format!("{}.{}", stem, extension(&mime)));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if !cli.quiet {
        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
    }
    if cli.open {
        SystemOpener.open(&path);
    }
    Ok(())
}

async fn write_unit(dir: &Path, unit: &PreviewUnit) -> Result<PathBuf> {
    let (mime, bytes) = decode_data_url(&unit.image)
        .with_context(|| format!("Preview of '{}' is not a data URL", unit.part_name))?;
    let stem = match unit.page_number {
        Some(page) => format!("{}-p{}", sanitize(&unit.part_name), page),
        None => sanitize(&unit.part_name),
    };
    let path = dir.join(format!("{}.{}", stem, extension(&mime)));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn label(unit: &PreviewUnit) -> String {
    match (unit.page_number, unit.total_expected) {
        (Some(page), Some(total)) => format!("{} {}/{}", unit.part_name, page, total),
        (Some(page), None) => format!("{} p{}", unit.part_name, page),
        _ => unit.part_name.clone(),
    }
}

fn sanitize(part_name: &str) -> String {
    part_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn extension(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

fn print_summary(report: &RunReport, written: usize, out_dir: Option<&Path>) {
    if report.placeholders == 0 {
        eprintln!("{} no previewable attachments ({} total)", dim("·"), report.attachments);
        return;
    }
    let failed = report.failed_attachments + report.failed_pages;
    eprintln!(
        "{}  {} previews from {}/{} attachments  {}ms",
        if failed == 0 { green("✔") } else { cyan("⚠") },
        bold(&report.previews.to_string()),
        report.placeholders,
        report.attachments,
        report.duration_ms,
    );
    if failed > 0 {
        eprintln!(
            "   {} attachments and {} pages failed",
            red(&report.failed_attachments.to_string()),
            red(&report.failed_pages.to_string()),
        );
    }
    if let Some(dir) = out_dir {
        eprintln!("   {} files written to {}", written, bold(&dir.display().to_string()));
    }
}
