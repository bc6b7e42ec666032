//! Configuration for a batch run.
//!
//! All run behaviour is controlled through [`RunConfig`], built either from a
//! config file ([`RunConfig::from_file`]) or programmatically via
//! [`RunConfigBuilder`]. The file carries the five keys every deployment
//! needs (`pdf_dir`, `output_dir`, and one credential per service) plus
//! optional tuning knobs, each with a documented default.
//!
//! Credentials live only in this struct and in the backends built from it;
//! nothing is read from process-wide globals at request time.

use crate::error::Pdf2NoteError;
use crate::progress::ProgressCallback;
use crate::registry::REGISTRY_FILE;
use crate::retry::RetryPolicy;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Directory (under `output_dir`) for text read from a PDF's text layer.
pub const TEXT_ARTIFACT_DIR: &str = "text_output";

/// Configuration for a batch run.
///
/// # Example
/// ```rust
/// use pdf2note::{GeneratorKind, RunConfig};
///
/// let config = RunConfig::builder()
///     .pdf_dir("papers")
///     .output_dir("notes")
///     .siliconflow_key("sk-...")
///     .generators(vec![GeneratorKind::SiliconFlow])
///     .build()
///     .unwrap();
/// assert_eq!(config.retry.max_attempts, 5);
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Directory scanned (non-recursively) for `*.pdf`.
    pub pdf_dir: PathBuf,

    /// Directory receiving notes, artefacts and the registry.
    pub output_dir: PathBuf,

    /// EasyDoc API key. Without it image-only PDFs cannot be parsed.
    pub easydoc_api_key: Option<String>,

    /// SiliconFlow bearer token for the plain-HTTP generator.
    pub siliconflow_key: Option<String>,

    /// Moonshot API key for the SDK-style generator.
    pub moonshot_api_key: Option<String>,

    /// EasyDoc fidelity mode. Default: [`ParseMode::Lite`].
    pub parse_mode: ParseMode,

    /// Whether to classify PDFs or send everything to the remote parser.
    pub routing: Routing,

    /// Generators in fallback order. Default: SiliconFlow, then Moonshot.
    pub generators: Vec<GeneratorKind>,

    /// Which attempts end up in the registry. Default: [`RegistryPolicy::RecordAll`].
    pub registry_policy: RegistryPolicy,

    /// Persist raw extraction/parse output next to the notes. Default: true.
    pub save_intermediates: bool,

    /// Attempts and pause for every remote call. Default: 5 × 30 s.
    pub retry: RetryPolicy,

    /// Pause between two processed documents. Default: 30 s.
    ///
    /// A self-imposed rate limit: the hosted services meter requests per
    /// minute, and one paper costs one parse plus at least one completion.
    pub document_delay: Duration,

    /// Per-HTTP-request timeout. Default: 300 s.
    ///
    /// Summarising a long paper with a 128k-context model routinely takes
    /// more than a minute, so this is generous.
    pub request_timeout: Duration,

    /// Replacement for the built-in literature-note template.
    pub system_prompt: Option<String>,

    /// Replacement for the built-in user instruction.
    pub user_instruction: Option<String>,

    /// Directory containing the pdfium shared library.
    /// If None, `PDFIUM_LIB_PATH` is consulted, then the system library.
    pub pdfium_lib_path: Option<PathBuf>,

    pub easydoc: EasyDocSettings,
    pub siliconflow: SiliconFlowSettings,
    pub moonshot: MoonshotSettings,

    /// Pre-constructed SDK provider for the Moonshot slot. Takes precedence
    /// over `moonshot` settings and `moonshot_api_key`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
            easydoc_api_key: None,
            siliconflow_key: None,
            moonshot_api_key: None,
            parse_mode: ParseMode::default(),
            routing: Routing::default(),
            generators: default_generators(),
            registry_policy: RegistryPolicy::default(),
            save_intermediates: true,
            retry: RetryPolicy::default(),
            document_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(300),
            system_prompt: None,
            user_instruction: None,
            pdfium_lib_path: None,
            easydoc: EasyDocSettings::default(),
            siliconflow: SiliconFlowSettings::default(),
            moonshot: MoonshotSettings::default(),
            provider: None,
            progress_callback: None,
        }
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("pdf_dir", &self.pdf_dir)
            .field("output_dir", &self.output_dir)
            .field("easydoc_api_key", &redact(&self.easydoc_api_key))
            .field("siliconflow_key", &redact(&self.siliconflow_key))
            .field("moonshot_api_key", &redact(&self.moonshot_api_key))
            .field("parse_mode", &self.parse_mode)
            .field("routing", &self.routing)
            .field("generators", &self.generators)
            .field("registry_policy", &self.registry_policy)
            .field("save_intermediates", &self.save_intermediates)
            .field("retry", &self.retry)
            .field("document_delay", &self.document_delay)
            .field("request_timeout", &self.request_timeout)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("easydoc", &self.easydoc)
            .field("siliconflow", &self.siliconflow)
            .field("moonshot", &self.moonshot)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load a config file. `.json` files are parsed as JSON, anything else as
    /// TOML. Relative paths inside the file resolve against the file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<RunConfig, Pdf2NoteError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Pdf2NoteError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let file = if is_json {
            ConfigFile::from_json_str(&raw)
        } else {
            ConfigFile::from_toml_str(&raw)
        }
        .map_err(|detail| Pdf2NoteError::ConfigParse {
            path: path.to_path_buf(),
            detail,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.into_config(base)
    }

    /// Location of the processed-files registry.
    pub fn registry_path(&self) -> PathBuf {
        self.output_dir.join(REGISTRY_FILE)
    }

    /// Location of the note for a document stem.
    pub fn note_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.md"))
    }

    /// Where the locally extracted text of a document is kept. Lives in its
    /// own subdirectory so it can never replace a note.
    pub fn extracted_text_path(&self, stem: &str) -> PathBuf {
        self.output_dir
            .join(TEXT_ARTIFACT_DIR)
            .join(format!("original_{stem}.md"))
    }
}

/// Builder for [`RunConfig`].
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl fmt::Debug for RunConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.config, f)
    }
}

impl RunConfigBuilder {
    pub fn pdf_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdf_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn easydoc_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.easydoc_api_key = Some(key.into());
        self
    }

    pub fn siliconflow_key(mut self, key: impl Into<String>) -> Self {
        self.config.siliconflow_key = Some(key.into());
        self
    }

    pub fn moonshot_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.moonshot_api_key = Some(key.into());
        self
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.config.parse_mode = mode;
        self
    }

    pub fn routing(mut self, routing: Routing) -> Self {
        self.config.routing = routing;
        self
    }

    pub fn generators(mut self, order: Vec<GeneratorKind>) -> Self {
        self.config.generators = order;
        self
    }

    pub fn registry_policy(mut self, policy: RegistryPolicy) -> Self {
        self.config.registry_policy = policy;
        self
    }

    pub fn save_intermediates(mut self, v: bool) -> Self {
        self.config.save_intermediates = v;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n.max(1);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.delay = delay;
        self
    }

    pub fn document_delay(mut self, delay: Duration) -> Self {
        self.config.document_delay = delay;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn user_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.user_instruction = Some(instruction.into());
        self
    }

    pub fn pdfium_lib_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(dir.into());
        self
    }

    pub fn easydoc(mut self, settings: EasyDocSettings) -> Self {
        self.config.easydoc = settings;
        self
    }

    pub fn siliconflow(mut self, settings: SiliconFlowSettings) -> Self {
        self.config.siliconflow = settings;
        self
    }

    pub fn moonshot(mut self, settings: MoonshotSettings) -> Self {
        self.config.moonshot = settings;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, Pdf2NoteError> {
        let c = &self.config;
        if c.pdf_dir.as_os_str().is_empty() {
            return Err(Pdf2NoteError::InvalidConfig("`pdf_dir` is required".into()));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(Pdf2NoteError::InvalidConfig(
                "`output_dir` is required".into(),
            ));
        }
        if c.generators.is_empty() {
            return Err(Pdf2NoteError::InvalidConfig(
                "`generators` must name at least one backend".into(),
            ));
        }
        for (i, g) in c.generators.iter().enumerate() {
            if c.generators[..i].contains(g) {
                return Err(Pdf2NoteError::InvalidConfig(format!(
                    "generator '{g}' is listed twice"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// EasyDoc parsing fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Fast layout analysis. (default)
    #[default]
    Lite,
    /// Adds VLM descriptions for tables and figures.
    Premium,
}

impl ParseMode {
    /// Value sent in the `mode` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Lite => "lite",
            ParseMode::Premium => "premium",
        }
    }
}

/// How documents are routed to a content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
    /// Text-bearing PDFs are extracted locally; image-only PDFs go remote. (default)
    #[default]
    Auto,
    /// Every PDF goes to the remote parser.
    Remote,
}

/// Which attempts are recorded in the processed-files registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryPolicy {
    /// Every attempted document, successful or not. Failed files need a manual
    /// registry edit to be retried. (default)
    #[default]
    RecordAll,
    /// Only documents whose note was written; failures are retried next run.
    SuccessOnly,
}

/// A note-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorKind {
    /// SiliconFlow chat-completions over plain HTTP.
    #[serde(rename = "siliconflow")]
    SiliconFlow,
    /// Moonshot through the SDK-style provider.
    #[serde(rename = "moonshot")]
    Moonshot,
}

impl GeneratorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::SiliconFlow => "siliconflow",
            GeneratorKind::Moonshot => "moonshot",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_generators() -> Vec<GeneratorKind> {
    vec![GeneratorKind::SiliconFlow, GeneratorKind::Moonshot]
}

// ── Service settings ─────────────────────────────────────────────────────

/// EasyDoc endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EasyDocSettings {
    /// Upload endpoint.
    pub parse_url: String,
    /// Result endpoint. `{task_id}` is substituted; without the placeholder
    /// the task id is appended as a path segment.
    pub result_url: String,
}

impl Default for EasyDocSettings {
    fn default() -> Self {
        Self {
            parse_url: "https://api.easydoc.sh/api/v1/parse".to_string(),
            result_url: "https://api.easydoc.sh/api/v1/parse/{task_id}/result".to_string(),
        }
    }
}

impl EasyDocSettings {
    pub fn result_url_for(&self, task_id: &str) -> String {
        if self.result_url.contains("{task_id}") {
            self.result_url.replace("{task_id}", task_id)
        } else {
            format!("{}/{}", self.result_url.trim_end_matches('/'), task_id)
        }
    }
}

/// SiliconFlow chat-completions request settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiliconFlowSettings {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    /// Non-standard code (HTTP status or body `code`) meaning "switch provider".
    pub switch_code: i64,
}

impl Default for SiliconFlowSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.siliconflow.cn/v1/chat/completions".to_string(),
            model: "deepseek-ai/DeepSeek-V3".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            top_p: 0.7,
            top_k: 50,
            frequency_penalty: 0.5,
            switch_code: 20042,
        }
    }
}

/// Moonshot settings for the SDK-style provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonshotSettings {
    /// edgequake-llm provider name. Moonshot speaks the OpenAI protocol.
    pub provider: String,
    pub model: String,
    /// OpenAI-compatible endpoint; used when `provider` is `openai`.
    pub base_url: Option<String>,
    pub temperature: f32,
}

impl Default for MoonshotSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "moonshot-v1-128k".to_string(),
            base_url: Some("https://api.moonshot.cn/v1".to_string()),
            temperature: 0.3,
        }
    }
}

// ── File format ──────────────────────────────────────────────────────────

/// On-disk configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub pdf_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub easydoc_api_key: Option<String>,
    #[serde(default)]
    pub siliconflow_key: Option<String>,
    #[serde(default)]
    pub moonshot_api_key: Option<String>,

    #[serde(default)]
    pub parse_mode: ParseMode,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default = "default_generators")]
    pub generators: Vec<GeneratorKind>,
    #[serde(default)]
    pub registry_policy: RegistryPolicy,
    #[serde(default = "default_true")]
    pub save_intermediates: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_delay_secs")]
    pub document_delay_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub user_instruction: Option<String>,
    #[serde(default)]
    pub pdfium_lib_path: Option<PathBuf>,

    #[serde(default)]
    pub easydoc: EasyDocSettings,
    #[serde(default)]
    pub siliconflow: SiliconFlowSettings,
    #[serde(default)]
    pub moonshot: MoonshotSettings,
}

fn default_true() -> bool {
    true
}
fn default_max_attempts() -> u32 {
    5
}
fn default_delay_secs() -> u64 {
    30
}
fn default_timeout_secs() -> u64 {
    300
}

impl ConfigFile {
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| e.to_string())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    /// Turn the file into a validated [`RunConfig`], resolving relative
    /// paths against `base`.
    pub fn into_config(self, base: &Path) -> Result<RunConfig, Pdf2NoteError> {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        let system_prompt = match self.system_prompt_file {
            Some(p) => {
                let p = resolve(p);
                Some(
                    std::fs::read_to_string(&p)
                        .map_err(|source| Pdf2NoteError::ConfigRead { path: p, source })?,
                )
            }
            None => None,
        };

        let mut builder = RunConfig::builder()
            .pdf_dir(resolve(self.pdf_dir))
            .output_dir(resolve(self.output_dir))
            .parse_mode(self.parse_mode)
            .routing(self.routing)
            .generators(self.generators)
            .registry_policy(self.registry_policy)
            .save_intermediates(self.save_intermediates)
            .max_attempts(self.max_attempts)
            .retry_delay(Duration::from_secs(self.retry_delay_secs))
            .document_delay(Duration::from_secs(self.document_delay_secs))
            .request_timeout(Duration::from_secs(self.request_timeout_secs))
            .easydoc(self.easydoc)
            .siliconflow(self.siliconflow)
            .moonshot(self.moonshot);

        // Blank keys are treated as absent so templates with `key = ""` work.
        let present = |k: Option<String>| k.filter(|s| !s.trim().is_empty());
        if let Some(k) = present(self.easydoc_api_key) {
            builder = builder.easydoc_api_key(k);
        }
        if let Some(k) = present(self.siliconflow_key) {
            builder = builder.siliconflow_key(k);
        }
        if let Some(k) = present(self.moonshot_api_key) {
            builder = builder.moonshot_api_key(k);
        }
        if let Some(p) = system_prompt {
            builder = builder.system_prompt(p);
        }
        if let Some(u) = self.user_instruction {
            builder = builder.user_instruction(u);
        }
        if let Some(p) = self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(resolve(p));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
pdf_dir = "papers"
output_dir = "notes"
easydoc_api_key = "ed-key"
siliconflow_key = "sf-key"
moonshot_api_key = "ms-key"
"#;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ConfigFile::from_toml_str(MINIMAL)
            .unwrap()
            .into_config(Path::new("/work"))
            .unwrap();

        assert_eq!(config.pdf_dir, PathBuf::from("/work/papers"));
        assert_eq!(config.output_dir, PathBuf::from("/work/notes"));
        assert_eq!(config.easydoc_api_key.as_deref(), Some("ed-key"));
        assert_eq!(config.parse_mode, ParseMode::Lite);
        assert_eq!(config.routing, Routing::Auto);
        assert_eq!(
            config.generators,
            vec![GeneratorKind::SiliconFlow, GeneratorKind::Moonshot]
        );
        assert_eq!(config.registry_policy, RegistryPolicy::RecordAll);
        assert_eq!(config.retry, RetryPolicy::new(5, Duration::from_secs(30)));
        assert_eq!(config.document_delay, Duration::from_secs(30));
        assert_eq!(config.siliconflow.switch_code, 20042);
        assert_eq!(config.moonshot.model, "moonshot-v1-128k");
    }

    #[test]
    fn json_config_with_overrides() {
        let raw = r#"{
            "pdf_dir": "/abs/papers",
            "output_dir": "out",
            "siliconflow_key": "sf",
            "parse_mode": "premium",
            "routing": "remote",
            "generators": ["moonshot", "siliconflow"],
            "registry_policy": "success-only",
            "max_attempts": 3,
            "retry_delay_secs": 5,
            "siliconflow": { "model": "deepseek-ai/DeepSeek-R1" }
        }"#;
        let config = ConfigFile::from_json_str(raw)
            .unwrap()
            .into_config(Path::new("/base"))
            .unwrap();

        assert_eq!(config.pdf_dir, PathBuf::from("/abs/papers"));
        assert_eq!(config.output_dir, PathBuf::from("/base/out"));
        assert_eq!(config.parse_mode, ParseMode::Premium);
        assert_eq!(config.routing, Routing::Remote);
        assert_eq!(config.generators[0], GeneratorKind::Moonshot);
        assert_eq!(config.registry_policy, RegistryPolicy::SuccessOnly);
        assert_eq!(config.retry, RetryPolicy::new(3, Duration::from_secs(5)));
        assert_eq!(config.siliconflow.model, "deepseek-ai/DeepSeek-R1");
        // untouched nested fields keep their defaults
        assert_eq!(config.siliconflow.max_tokens, 8192);
    }

    #[test]
    fn blank_keys_are_absent() {
        let raw = "pdf_dir = \"p\"\noutput_dir = \"o\"\neasydoc_api_key = \"  \"\n";
        let config = ConfigFile::from_toml_str(raw)
            .unwrap()
            .into_config(Path::new("."))
            .unwrap();
        assert!(config.easydoc_api_key.is_none());
    }

    #[test]
    fn unknown_key_is_rejected() {
        let raw = "pdf_dir = \"p\"\noutput_dir = \"o\"\npdf_directory = \"typo\"\n";
        assert!(ConfigFile::from_toml_str(raw).is_err());
    }

    #[test]
    fn missing_pdf_dir_is_rejected() {
        assert!(ConfigFile::from_toml_str("output_dir = \"o\"\n").is_err());
        assert!(RunConfig::builder().output_dir("o").build().is_err());
    }

    #[test]
    fn duplicate_generator_is_rejected() {
        let err = RunConfig::builder()
            .pdf_dir("p")
            .output_dir("o")
            .generators(vec![GeneratorKind::Moonshot, GeneratorKind::Moonshot])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = RunConfig::builder()
            .pdf_dir("p")
            .output_dir("o")
            .siliconflow_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn result_url_substitution() {
        let s = EasyDocSettings::default();
        assert_eq!(
            s.result_url_for("t-1"),
            "https://api.easydoc.sh/api/v1/parse/t-1/result"
        );
        let s = EasyDocSettings {
            parse_url: "http://x/parse".into(),
            result_url: "http://x/result/".into(),
        };
        assert_eq!(s.result_url_for("t-1"), "http://x/result/t-1");
    }

    #[test]
    fn note_and_registry_paths() {
        let config = RunConfig::builder()
            .pdf_dir("p")
            .output_dir("/notes")
            .build()
            .unwrap();
        assert_eq!(config.note_path("smith2021"), PathBuf::from("/notes/smith2021.md"));
        assert_eq!(
            config.registry_path(),
            PathBuf::from("/notes/processed_files.json")
        );
        assert_eq!(
            config.extracted_text_path("smith2021"),
            PathBuf::from("/notes/text_output/original_smith2021.md")
        );
    }
}
