//! Remote parsing through the EasyDoc document-understanding service.
//!
//! Used for image-only PDFs (and for every PDF when routing is `remote`).
//! One parse is two HTTP calls:
//!
//! 1. `POST parse_url`: multipart upload of the PDF plus `mode`, returning
//!    `data.task_id`.
//! 2. `GET result_url` for that task: returning `data.task_result`, which is
//!    rendered to Markdown by [`crate::pipeline::blocks`].
//!
//! Any failure in either call (network, non-200, missing task id, a result
//! with neither `nodes` nor `blocks`) costs one attempt of the configured
//! [`RetryPolicy`]. Once an upload has been accepted its task id is kept, so
//! later attempts only poll the result; the PDF is uploaded again only while
//! no upload has succeeded. When the budget runs out the parser reports "no
//! content" rather than an error; the coordinator records that as a parse
//! failure.

use crate::config::{EasyDocSettings, ParseMode};
use crate::error::{BackendError, Pdf2NoteError};
use crate::output::Document;
use crate::pipeline::blocks::TaskResult;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE: &str = "easydoc";

/// Directory (under the artefact root) for raw result JSON.
pub const JSON_ARTIFACT_DIR: &str = "json_output";
/// Directory (under the artefact root) for rendered Markdown.
pub const MARKDOWN_ARTIFACT_DIR: &str = "markdown_output";

/// Turns a PDF into Markdown remotely.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// `None` means the parser gave up; the reason has already been logged.
    async fn parse(&self, doc: &Document) -> Option<String>;
}

/// HTTP client for the EasyDoc parse API.
pub struct EasyDocParser {
    client: reqwest::Client,
    api_key: String,
    mode: ParseMode,
    settings: EasyDocSettings,
    retry: RetryPolicy,
    artifacts_dir: Option<PathBuf>,
}

impl std::fmt::Debug for EasyDocParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EasyDocParser")
            .field("api_key", &"<redacted>")
            .field("mode", &self.mode)
            .field("settings", &self.settings)
            .field("retry", &self.retry)
            .field("artifacts_dir", &self.artifacts_dir)
            .finish()
    }
}

/// A successful parse: the raw result body and its rendering.
#[derive(Debug, Clone)]
struct ParsedDocument {
    raw: Value,
    markdown: String,
}

impl EasyDocParser {
    pub fn new(
        api_key: impl Into<String>,
        mode: ParseMode,
        settings: EasyDocSettings,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, Pdf2NoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Pdf2NoteError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            mode,
            settings,
            retry,
            artifacts_dir: None,
        })
    }

    /// Persist `json_output/<stem>.json` and `markdown_output/<stem>.md`
    /// under `dir` after every successful parse.
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    async fn submit(&self, doc: &Document, pdf: &[u8]) -> Result<String, BackendError> {
        let part = Part::bytes(pdf.to_vec())
            .file_name(doc.name.clone())
            .mime_str("application/pdf")
            .map_err(|e| BackendError::transient(SERVICE, e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("mode", self.mode.as_str());

        let response = self
            .client
            .post(&self.settings.parse_url)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::transient(SERVICE, format!("upload failed: {e}")))?;

        let body = read_json(response, "upload").await?;
        task_id(&body).ok_or_else(|| {
            BackendError::transient(SERVICE, format!("no task_id in upload response: {body}"))
        })
    }

    async fn fetch(&self, task_id: &str) -> Result<ParsedDocument, BackendError> {
        let url = self.settings.result_url_for(task_id);
        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| BackendError::transient(SERVICE, format!("result fetch failed: {e}")))?;

        let raw = read_json(response, "result").await?;
        let markdown = render_result(&raw)?;
        Ok(ParsedDocument { raw, markdown })
    }

    /// One attempt: upload unless a task is already known, then fetch.
    async fn parse_once(
        &self,
        doc: &Document,
        pdf: &[u8],
        task: &Mutex<Option<String>>,
    ) -> Result<ParsedDocument, BackendError> {
        let known = task.lock().ok().and_then(|t| t.clone());
        let task_id = match known {
            Some(id) => {
                debug!("{}: polling EasyDoc task {id}", doc.name);
                id
            }
            None => {
                let id = self.submit(doc, pdf).await?;
                debug!("{}: EasyDoc task {id}", doc.name);
                if let Ok(mut slot) = task.lock() {
                    *slot = Some(id.clone());
                }
                id
            }
        };
        self.fetch(&task_id).await
    }

    async fn save_artifacts(&self, doc: &Document, parsed: &ParsedDocument) {
        let Some(root) = &self.artifacts_dir else {
            return;
        };
        let json = serde_json::to_string_pretty(&parsed.raw)
            .unwrap_or_else(|_| parsed.raw.to_string());
        let targets = [
            (root.join(JSON_ARTIFACT_DIR), format!("{}.json", doc.stem), json),
            (
                root.join(MARKDOWN_ARTIFACT_DIR),
                format!("{}.md", doc.stem),
                parsed.markdown.clone(),
            ),
        ];
        for (dir, file, contents) in targets {
            if let Err(e) = write_artifact(&dir, &file, &contents).await {
                warn!("{}: could not save {}: {e}", doc.name, dir.join(&file).display());
            }
        }
    }
}

#[async_trait]
impl DocumentParser for EasyDocParser {
    async fn parse(&self, doc: &Document) -> Option<String> {
        let pdf = match tokio::fs::read(&doc.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("{}: cannot read for upload: {e}", doc.name);
                return None;
            }
        };

        let what = format!("{} via EasyDoc", doc.name);
        let task = Mutex::new(None);
        let (pdf, task) = (&pdf, &task);
        let parsed = self
            .retry
            .run(
                &what,
                move |_| self.parse_once(doc, pdf, task),
                BackendError::is_retryable,
            )
            .await;

        match parsed {
            Ok(parsed) => {
                info!(
                    "{}: EasyDoc returned {} chars of Markdown",
                    doc.name,
                    parsed.markdown.len()
                );
                self.save_artifacts(doc, &parsed).await;
                Some(parsed.markdown)
            }
            Err(exhausted) => {
                warn!(
                    "{}: EasyDoc gave up after {} attempt(s): {}",
                    doc.name, exhausted.attempts, exhausted.last_error
                );
                None
            }
        }
    }
}

/// Require HTTP 200 and a JSON body.
async fn read_json(response: reqwest::Response, step: &str) -> Result<Value, BackendError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| BackendError::transient(SERVICE, format!("{step}: reading body: {e}")))?;
    if status != reqwest::StatusCode::OK {
        return Err(BackendError::transient(
            SERVICE,
            format!("{step}: HTTP {status}: {}", snippet(&text)),
        ));
    }
    serde_json::from_str(&text).map_err(|e| {
        BackendError::transient(SERVICE, format!("{step}: invalid JSON ({e}): {}", snippet(&text)))
    })
}

/// `data.task_id`, accepting either a string or a number.
fn task_id(body: &Value) -> Option<String> {
    match body.pointer("/data/task_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Render `data.task_result` of a result response.
fn render_result(raw: &Value) -> Result<String, BackendError> {
    let result = raw.pointer("/data/task_result").ok_or_else(|| {
        let detail = match raw.pointer("/data/status").and_then(Value::as_str) {
            Some(status) => format!("task is {status}, no data.task_result yet"),
            None => "response has no data.task_result".to_string(),
        };
        BackendError::transient(SERVICE, detail)
    })?;
    let result: TaskResult = serde_json::from_value(result.clone())
        .map_err(|e| BackendError::transient(SERVICE, format!("undecodable task_result: {e}")))?;
    result
        .render()
        .ok_or_else(|| BackendError::transient(SERVICE, "task_result has neither nodes nor blocks"))
}

async fn write_artifact(dir: &Path, file: &str, contents: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(file), contents).await
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
