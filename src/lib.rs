//! # pdf2note
//!
//! Turn a directory of research PDFs into Obsidian-style literature notes.
//!
//! ## Why this crate?
//!
//! Summarising a reading list by hand means copying text out of each paper,
//! pasting it into a chat window and saving the answer. This crate does that
//! in batch: it extracts each PDF's text (or has a scanned PDF parsed by
//! EasyDoc), asks a language model for a structured note, and remembers which
//! files it has already handled so the next run only picks up new papers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pdf_dir/*.pdf
//!  │
//!  ├─ 1. Discover  list PDFs, drop those already in processed_files.json
//!  ├─ 2. Classify  text layer present? (pdfium, spawn_blocking)
//!  ├─ 3a. Extract  join page text                         (text-bearing)
//!  ├─ 3b. Parse    EasyDoc upload → blocks → Markdown      (image-only)
//!  ├─ 4. Generate  SiliconFlow, then Moonshot on failure
//!  └─ 5. Record    note on disk, registry rewritten, pause, next PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2note::{run, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::from_file("pdf2note.toml")?;
//!     let report = run(&config).await?;
//!     eprintln!(
//!         "{} written, {} skipped, {} failed",
//!         report.written().len(),
//!         report.skipped(),
//!         report.failed().len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2note` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2note = { version = "0.1", default-features = false }
//! ```
//!
//! ## Pacing
//!
//! Every remote call gets at most 5 attempts 30 s apart, and the run pauses
//! 30 s between documents. Both are configurable; rate-limit responses are
//! never retried, the next generator is tried instead.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod retry;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConfigFile, EasyDocSettings, GeneratorKind, MoonshotSettings, ParseMode, RegistryPolicy,
    Routing, RunConfig, RunConfigBuilder, SiliconFlowSettings,
};
pub use error::{BackendError, GenerateError, Pdf2NoteError};
pub use generator::{Conversation, FallbackChain, NoteBackend, NoteGenerator};
pub use output::{Document, DocumentOutcome, DocumentReport, FailureStage, RunReport};
pub use pipeline::easydoc::{DocumentParser, EasyDocParser};
pub use pipeline::text::{DocumentKind, PdfiumReader, TextLayerReader};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use registry::ProcessedRegistry;
pub use retry::RetryPolicy;
pub use run::{run, run_sync, Coordinator};
