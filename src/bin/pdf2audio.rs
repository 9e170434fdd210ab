//! CLI binary for edgequake-pdf2audio.
//!
//! Walks one PDF through the whole wizard against the mock collaborators:
//! upload, delete the pages given by `--delete`, extract, optionally replace
//! the text with `--text-file`, generate audio, and print the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2audio::{
    MockConfig, Observer, SourceFile, Stage, Step, WizardConfig, WizardObserver, WizardSession,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Terminal observer: a spinner while a collaborator runs, plus one log line
/// per completed step.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Waiting");
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Upload => "Processing your PDF…",
        Stage::Extraction => "Extracting text…",
        Stage::AudioGeneration => "Generating audio file…",
    }
}

impl WizardObserver for CliProgress {
    fn on_step_changed(&self, _from: Step, to: Step) {
        let indicator: Vec<String> = Step::ALL
            .iter()
            .map(|s| {
                let n = (s.index() + 1).to_string();
                if *s == to {
                    cyan(&n)
                } else if s.is_completed_before(to) {
                    green(&n)
                } else {
                    dim(&n)
                }
            })
            .collect();
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            indicator.join(dim("─").as_str()),
            bold(to.label())
        ));
    }

    fn on_collaborator_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(stage_message(stage));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_collaborator_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.disable_steady_tick();
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.set_message("");
    }

    fn on_collaborator_error(&self, stage: Stage, error: &str) {
        self.bar.disable_steady_tick();
        self.bar
            .println(format!("  {} {:<18} {}", red("✗"), stage.to_string(), red(error)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the whole wizard on a PDF (mock collaborators)
  pdf2audio document.pdf

  # Drop the cover and pages 10-12 before extraction
  pdf2audio --delete 1,10-12 document.pdf

  # Replace the extracted text before generating audio
  pdf2audio --text-file script.txt document.pdf

  # Fast run, JSON output
  pdf2audio --upload-delay-ms 0 --extract-delay-ms 0 --audio-delay-ms 0 --json document.pdf

ENVIRONMENT VARIABLES:
  RUST_LOG                Override log filter (e.g. edgequake_pdf2audio=debug)
"#;

/// Walk a PDF through the PDF-to-audio wizard.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2audio",
    version,
    about = "Walk a PDF through the upload → pages → text → audio wizard",
    long_about = "Run the PDF-to-audio wizard end to end: validate and upload a PDF, delete \
unwanted pages, extract and optionally replace the text, then generate audio. The \
collaborators are mocks with configurable latency.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Pages to delete (1-indexed): 5, 3-7, or 1,3,5-7.
    #[arg(long, env = "PDF2AUDIO_DELETE")]
    delete: Option<String>,

    /// Replace the extracted text with the contents of this file.
    #[arg(long, env = "PDF2AUDIO_TEXT_FILE")]
    text_file: Option<PathBuf>,

    /// Number of pages the mock uploader produces.
    #[arg(long, env = "PDF2AUDIO_MOCK_PAGES", default_value_t = 24)]
    mock_pages: usize,

    /// Mock upload latency in milliseconds.
    #[arg(long, env = "PDF2AUDIO_UPLOAD_DELAY_MS", default_value_t = 2000)]
    upload_delay_ms: u64,

    /// Mock extraction latency in milliseconds.
    #[arg(long, env = "PDF2AUDIO_EXTRACT_DELAY_MS", default_value_t = 1000)]
    extract_delay_ms: u64,

    /// Mock audio generation latency in milliseconds.
    #[arg(long, env = "PDF2AUDIO_AUDIO_DELAY_MS", default_value_t = 3000)]
    audio_delay_ms: u64,

    /// Per-collaborator timeout in seconds.
    #[arg(long, env = "PDF2AUDIO_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Automatic retries per collaborator call.
    #[arg(long, env = "PDF2AUDIO_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Upload size limit in MiB.
    #[arg(long, env = "PDF2AUDIO_MAX_UPLOAD_MB", default_value_t = 10)]
    max_upload_mb: u64,

    /// Print the final wizard state as JSON.
    #[arg(long, env = "PDF2AUDIO_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2AUDIO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2AUDIO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2AUDIO_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgress::new);

    let mut builder = WizardConfig::builder()
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .collaborator_timeout_secs(cli.timeout)
        .max_retries(cli.max_retries);
    if let Some(ref p) = progress {
        builder = builder.observer(Arc::clone(p) as Observer);
    }
    let config = builder.build().context("Invalid configuration")?;

    let mock = MockConfig {
        page_count: cli.mock_pages,
        upload_delay_ms: cli.upload_delay_ms,
        extract_delay_ms: cli.extract_delay_ms,
        audio_delay_ms: cli.audio_delay_ms,
    };

    let deletions = match cli.delete {
        Some(ref s) => parse_page_list(s)?,
        None => Vec::new(),
    };
    let replacement = match cli.text_file {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read text from {:?}", path))?,
        ),
        None => None,
    };

    // ── Run the wizard ───────────────────────────────────────────────────
    let file = SourceFile::open(&cli.input, config.max_upload_bytes)
        .context("Cannot upload this file")?;
    let session = WizardSession::with_mocks(config, &mock);

    let result = run(&session, &file, &deletions, replacement).await;
    if let Some(ref p) = progress {
        p.finish();
    }
    let audio = result?;

    // ── Report ───────────────────────────────────────────────────────────
    let snapshot = session.snapshot();

    if cli.json {
        let out = serde_json::json!({
            "state": snapshot,
            "audio": audio,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if !cli.quiet {
        if let Some(ref doc) = snapshot.document {
            eprintln!(
                "{}  {}  {}/{} pages kept  {} characters  ~{} min",
                green("✔"),
                bold(&doc.filename),
                doc.active_pages.len(),
                doc.total_pages,
                snapshot.text_stats.characters,
                snapshot.text_stats.estimated_audio_minutes,
            );
        }
    }
    println!("{audio}");

    Ok(())
}

/// Drive the session from upload to audio ready.
async fn run(
    session: &WizardSession,
    file: &SourceFile,
    deletions: &[PageRange],
    replacement: Option<String>,
) -> Result<edgequake_pdf2audio::AudioArtifactRef> {
    session.upload(file).await.context("Upload failed")?;

    let page_count = session.with_state(|c| c.page_count());
    for index in resolve_deletions(deletions, page_count)? {
        session
            .toggle_page(index)
            .with_context(|| format!("Cannot delete page {}", index + 1))?;
    }
    if !session.can_advance_from_selection() {
        anyhow::bail!("Every page was deleted; keep at least one page");
    }

    session.extract().await.context("Text extraction failed")?;

    if let Some(text) = replacement {
        session.edit_text(text).context("Cannot replace text")?;
    }

    session
        .generate_audio()
        .await
        .context("Audio generation failed")?
        .applied()
        .context("Session was reset before audio was ready")
}

/// One `--delete` entry: an inclusive, 1-indexed page range. A single page
/// is a range of length one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageRange {
    start: usize,
    end: usize,
}

/// Parse `--delete` into ranges. Ranges stay unexpanded until the page count
/// is known.
fn parse_page_list(s: &str) -> Result<Vec<PageRange>> {
    let mut ranges = Vec::new();

    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid start page in range '{part}'"))?;
                let end: usize = end
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid end page in range '{part}'"))?;
                if start > end {
                    anyhow::bail!("Invalid page range '{}': start must be <= end", part);
                }
                (start, end)
            }
            None => {
                let page: usize = part
                    .parse()
                    .with_context(|| format!("Invalid page number: '{part}'"))?;
                (page, page)
            }
        };
        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        ranges.push(PageRange { start, end });
    }

    Ok(ranges)
}

/// Resolve ranges against the uploaded page count into sorted, deduplicated
/// 0-based indices. Range ends past the last page are clamped; a range that
/// starts past the last page is an error.
///
/// Deduplication matters: deleting a page twice would restore it.
fn resolve_deletions(ranges: &[PageRange], page_count: usize) -> Result<Vec<usize>> {
    let mut indices = Vec::new();

    for range in ranges {
        if range.start > page_count {
            anyhow::bail!(
                "Cannot delete page {}: the document has {} pages",
                range.start,
                page_count
            );
        }
        indices.extend(range.start - 1..range.end.min(page_count));
    }

    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}
