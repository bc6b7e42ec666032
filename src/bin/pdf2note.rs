//! CLI binary for pdf2note.
//!
//! A thin shim over the library crate: every run parameter comes from the
//! config file; flags only control where that file is and how much the
//! terminal shows.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2note::{run, DocumentOutcome, ProgressCallback, RunConfig, RunProgressCallback};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar over the pending documents, one log line per finished document.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, pending: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(pending as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Summarising");
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, discovered: usize, pending: usize) {
        self.activate_bar(pending);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{discovered} PDFs found, {pending} to process, {} already done",
                discovered - pending
            ))
        ));
    }

    fn on_document_start(&self, _index: usize, _pending: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_stage(&self, name: &str, stage: &str) {
        self.bar.set_message(format!("{name}  {}", dim(stage)));
    }

    fn on_document_complete(&self, name: &str, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Skipped => return,
            DocumentOutcome::NoteWritten { generator, note } => self.bar.println(format!(
                "  {} {}  {}",
                green("✓"),
                name,
                dim(&format!("{generator} → {}", note.display())),
            )),
            DocumentOutcome::Failed { stage, reason } => {
                // Keep very long provider errors on one line.
                let msg: String = if reason.chars().count() > 80 {
                    format!("{}\u{2026}", reason.chars().take(79).collect::<String>())
                } else {
                    reason.clone()
                };
                self.bar.println(format!(
                    "  {} {}  {} {}",
                    red("✗"),
                    name,
                    red(&format!("[{stage}]")),
                    red(&msg),
                ))
            }
        }
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _written: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Use ./pdf2note.toml
  pdf2note

  # Explicit config, machine-readable report
  pdf2note --config ~/papers/pdf2note.toml --json > report.json

CONFIG FILE (TOML, or JSON when the name ends in .json):
  pdf_dir          = "papers"          # scanned for *.pdf, not recursive
  output_dir       = "notes"           # notes, artefacts, processed_files.json
  easydoc_api_key  = "..."             # remote parsing of scanned PDFs
  siliconflow_key  = "sk-..."          # primary generator
  moonshot_api_key = "sk-..."          # fallback generator

  # optional
  generators          = ["siliconflow", "moonshot"]
  routing             = "auto"         # or "remote"
  parse_mode          = "lite"         # or "premium"
  registry_policy     = "record-all"   # or "success-only"
  max_attempts        = 5
  retry_delay_secs    = 30
  document_delay_secs = 30

ENVIRONMENT VARIABLES:
  PDF2NOTE_CONFIG  Config file path (same as --config)
  PDFIUM_LIB_PATH  Directory containing libpdfium
  RUST_LOG         Override log filter (e.g. pdf2note=debug)
"#;

/// Batch-summarise PDFs into literature notes.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2note",
    version,
    about = "Batch-summarise a directory of PDFs into Markdown literature notes",
    long_about = "Walk a directory of PDFs, extract text locally or through the EasyDoc \
parser for scanned documents, and ask SiliconFlow (falling back to Moonshot) for a \
structured literature note per document. Already processed files are remembered in \
processed_files.json and skipped on the next run.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the TOML/JSON config file.
    #[arg(short, long, env = "PDF2NOTE_CONFIG", default_value = "pdf2note.toml")]
    config: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2NOTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2NOTE_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2NOTE_NO_PROGRESS")]
    no_progress: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode shows everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
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
    let mut config = RunConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;

    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        config.progress_callback = Some(cb);
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&config).await.context("Run aborted")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let written = report.written().len();
        let failed = report.failed();
        eprintln!(
            "{}  {} written  {} skipped  {} failed  {}",
            if failed.is_empty() { green("✔") } else { cyan("⚠") },
            bold(&written.to_string()),
            report.skipped(),
            if failed.is_empty() {
                "0".to_string()
            } else {
                red(&failed.len().to_string())
            },
            dim(&format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
        );
        if failed.is_empty() {
            eprintln!("All documents processed.");
        } else {
            eprintln!("\nThese files failed:");
            for name in failed {
                eprintln!("  - {name}");
            }
        }
    }

    Ok(())
}
