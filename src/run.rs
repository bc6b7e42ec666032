//! Batch entry points: walk the input directory and write one note per PDF.
//!
//! Documents are handled strictly one after another:
//!
//! ```text
//! discovered ─▶ skipped (already in registry)
//!     │
//!     ▼
//! classified ─▶ text extracted ─┐
//!     │                         ├─▶ note written
//!     └──────▶ remote parsed ───┘    or failed
//! ```
//!
//! After every attempted document the registry is rewritten, so an
//! interrupted run resumes where it stopped. Per-document problems (corrupt
//! PDF, parser gave up, every generator failed) end up in the
//! [`RunReport`]; only setup problems return `Err`.

use crate::config::{RegistryPolicy, Routing, RunConfig};
use crate::error::Pdf2NoteError;
use crate::generator::{write_note, FallbackChain};
use crate::output::{Document, DocumentOutcome, FailureStage, RunReport};
use crate::pipeline::easydoc::{DocumentParser, EasyDocParser};
use crate::pipeline::input::discover_pdfs;
use crate::pipeline::text::{
    classify_pages, join_pages, DocumentKind, PdfiumReader, TextLayerReader,
};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::registry::ProcessedRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Process every PDF in `config.pdf_dir`.
///
/// # Errors
/// Returns `Err(Pdf2NoteError)` only for fatal errors:
/// - the input directory is missing or unreadable
/// - the output directory or registry cannot be written
/// - a configured generator has no credentials
///
/// # Example
/// ```rust,no_run
/// use pdf2note::{run, RunConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RunConfig::from_file("pdf2note.toml")?;
/// let report = run(&config).await?;
/// for name in report.failed() {
///     eprintln!("failed: {name}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run(config: &RunConfig) -> Result<RunReport, Pdf2NoteError> {
    Coordinator::from_config(config.clone())?.run().await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &RunConfig) -> Result<RunReport, Pdf2NoteError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2NoteError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Owns the stages of one batch run.
pub struct Coordinator {
    config: RunConfig,
    reader: Arc<dyn TextLayerReader>,
    parser: Option<Arc<dyn DocumentParser>>,
    chain: FallbackChain,
}

impl Coordinator {
    /// Assemble the stages from explicit parts.
    ///
    /// `parser` may be `None`; image-only documents then fail at the parse
    /// stage.
    pub fn new(
        config: RunConfig,
        reader: Arc<dyn TextLayerReader>,
        parser: Option<Arc<dyn DocumentParser>>,
        chain: FallbackChain,
    ) -> Self {
        Self {
            config,
            reader,
            parser,
            chain,
        }
    }

    /// Build pdfium, EasyDoc and the generator chain from `config`.
    pub fn from_config(config: RunConfig) -> Result<Self, Pdf2NoteError> {
        let reader = Arc::new(PdfiumReader::new(config.pdfium_lib_path.clone()));

        let parser: Option<Arc<dyn DocumentParser>> = match &config.easydoc_api_key {
            Some(key) => {
                let mut parser = EasyDocParser::new(
                    key,
                    config.parse_mode,
                    config.easydoc.clone(),
                    config.retry,
                    config.request_timeout,
                )?;
                if config.save_intermediates {
                    parser = parser.with_artifacts(&config.output_dir);
                }
                Some(Arc::new(parser))
            }
            None if config.routing == Routing::Remote => {
                return Err(Pdf2NoteError::ProviderNotConfigured {
                    provider: "easydoc".to_string(),
                    hint: "`routing = \"remote\"` needs `easydoc_api_key` in the config file."
                        .to_string(),
                })
            }
            None => None,
        };

        let chain = FallbackChain::from_config(&config)?;
        Ok(Self::new(config, reader, parser, chain))
    }

    fn progress(&self) -> ProgressCallback {
        self.config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback))
    }

    /// Visit every discovered document once.
    pub async fn run(&self) -> Result<RunReport, Pdf2NoteError> {
        let start = Instant::now();
        let config = &self.config;
        let cb = self.progress();

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|source| Pdf2NoteError::OutputWriteFailed {
                path: config.output_dir.clone(),
                source,
            })?;

        let documents = discover_pdfs(&config.pdf_dir)?;
        let mut registry = ProcessedRegistry::load(config.registry_path())?;
        let pending = documents
            .iter()
            .filter(|d| !registry.contains(&d.name))
            .count();

        info!(
            "Found {} PDFs in {}, {} not yet processed; generators: {}",
            documents.len(),
            config.pdf_dir.display(),
            pending,
            self.chain.names().join(" → ")
        );
        cb.on_run_start(documents.len(), pending);

        let mut report = RunReport::default();
        let mut attempted = 0usize;

        for doc in &documents {
            if registry.contains(&doc.name) {
                debug!("{}: already processed, skipping", doc.name);
                cb.on_document_complete(&doc.name, &DocumentOutcome::Skipped);
                report.push(&doc.name, DocumentOutcome::Skipped);
                continue;
            }

            if attempted > 0 && !config.document_delay.is_zero() {
                info!(
                    "Waiting {}s before the next document",
                    config.document_delay.as_secs_f32()
                );
                tokio::time::sleep(config.document_delay).await;
            }
            attempted += 1;

            info!("[{attempted}/{pending}] Processing {}", doc.name);
            cb.on_document_start(attempted, pending, &doc.name);

            let outcome = self.process(doc, &cb).await;
            match &outcome {
                DocumentOutcome::NoteWritten { generator, note } => {
                    info!("{}: note written by {generator} to {}", doc.name, note.display())
                }
                DocumentOutcome::Failed { stage, reason } => {
                    warn!("{}: failed at {stage}: {reason}", doc.name)
                }
                DocumentOutcome::Skipped => {}
            }

            let record = match config.registry_policy {
                RegistryPolicy::RecordAll => true,
                RegistryPolicy::SuccessOnly => !outcome.is_failed(),
            };
            if record {
                registry.record(&doc.name)?;
            }

            cb.on_document_complete(&doc.name, &outcome);
            report.push(&doc.name, outcome);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        let failed = report.failed();
        if failed.is_empty() {
            info!(
                "Done: {} note(s) written, {} skipped",
                report.written().len(),
                report.skipped()
            );
        } else {
            warn!(
                "Done: {} note(s) written, {} failed: {}",
                report.written().len(),
                failed.len(),
                failed.join(", ")
            );
        }
        cb.on_run_complete(report.written().len(), failed.len());

        Ok(report)
    }

    /// Take one document from classification to a terminal outcome.
    async fn process(&self, doc: &Document, cb: &ProgressCallback) -> DocumentOutcome {
        let content = match self.content_for(doc, cb).await {
            Ok(content) => content,
            Err(outcome) => return outcome,
        };

        if content.trim().is_empty() {
            return failed(FailureStage::EmptyContent, "no usable content extracted");
        }

        let dest = self.config.note_path(&doc.stem);
        let result = self
            .chain
            .generate(&content, &dest, |generator| {
                cb.on_stage(&doc.name, &format!("generating via {generator}"))
            })
            .await;

        match result {
            Ok(generator) => DocumentOutcome::NoteWritten {
                generator: generator.to_string(),
                note: dest,
            },
            Err(failures) => {
                let reason = failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                failed(FailureStage::Generate, reason)
            }
        }
    }

    /// Extract locally or parse remotely according to routing and document
    /// kind. `Err` carries the terminal failure.
    async fn content_for(
        &self,
        doc: &Document,
        cb: &ProgressCallback,
    ) -> Result<String, DocumentOutcome> {
        if self.config.routing == Routing::Remote {
            return self.parse_remote(doc, cb).await;
        }

        cb.on_stage(&doc.name, "reading text layer");
        let pages = self
            .reader
            .page_texts(&doc.path)
            .await
            .map_err(|e| failed(FailureStage::Read, e.to_string()))?;

        match classify_pages(&pages) {
            DocumentKind::TextBearing => {
                let text = join_pages(&pages);
                info!(
                    "{}: text layer found ({} pages, {} chars)",
                    doc.name,
                    pages.len(),
                    text.len()
                );
                if self.config.save_intermediates {
                    let path = self.config.extracted_text_path(&doc.stem);
                    if let Err(e) = write_note(&path, &text).await {
                        warn!("{}: could not save extracted text: {e}", doc.name);
                    }
                }
                Ok(text)
            }
            DocumentKind::ImageOnly => {
                info!("{}: no text layer, sending to remote parser", doc.name);
                self.parse_remote(doc, cb).await
            }
        }
    }

    async fn parse_remote(
        &self,
        doc: &Document,
        cb: &ProgressCallback,
    ) -> Result<String, DocumentOutcome> {
        let Some(parser) = &self.parser else {
            return Err(failed(
                FailureStage::Parse,
                "image-only PDF but `easydoc_api_key` is not configured",
            ));
        };
        cb.on_stage(&doc.name, "remote parse");
        parser.parse(doc).await.ok_or_else(|| {
            failed(
                FailureStage::Parse,
                format!(
                    "remote parser returned no content after up to {} attempt(s)",
                    self.config.retry.max_attempts
                ),
            )
        })
    }
}

fn failed(stage: FailureStage, reason: impl Into<String>) -> DocumentOutcome {
    DocumentOutcome::Failed {
        stage,
        reason: reason.into(),
    }
}
