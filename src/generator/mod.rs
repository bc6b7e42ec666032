//! Note generation: content in, literature note on disk out.
//!
//! A [`NoteGenerator`] wraps one [`NoteBackend`] (a completion service) with
//! the shared [`RetryPolicy`] and the note-writing contract:
//!
//! * the backend sees a fixed three-turn [`Conversation`];
//! * only [`BackendError::Transient`] failures are retried;
//! * the first non-blank completion is written verbatim to the destination,
//!   atomically, and nothing is written on failure.
//!
//! A [`FallbackChain`] holds the generators in configured order and hands the
//! same content to each until one succeeds.
//!
//! ## Backends
//!
//! | Module | Service | Transport |
//! |--------|---------|-----------|
//! | [`siliconflow`] | SiliconFlow chat completions | plain HTTP (`reqwest`) |
//! | [`provider`] | Moonshot or any OpenAI-compatible API | `edgequake-llm` provider |

pub mod provider;
pub mod siliconflow;

use crate::config::{GeneratorKind, RunConfig};
use crate::error::{BackendError, GenerateError, Pdf2NoteError};
use crate::prompts::{LITERATURE_NOTE_PROMPT, USER_INSTRUCTION};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use provider::ProviderBackend;
pub use siliconflow::SiliconFlowBackend;

/// Chat role of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// The messages sent to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub turns: Vec<Turn>,
}

impl Conversation {
    /// Template as system turn, document content as a second system turn,
    /// then the user instruction.
    pub fn literature_note(system_prompt: &str, content: &str, instruction: &str) -> Self {
        let turn = |role, content: &str| Turn {
            role,
            content: content.to_string(),
        };
        Self {
            turns: vec![
                turn(Role::System, system_prompt),
                turn(Role::System, content),
                turn(Role::User, instruction),
            ],
        }
    }

    pub fn total_chars(&self) -> usize {
        self.turns.iter().map(|t| t.content.len()).sum()
    }
}

/// A completion service.
#[async_trait]
pub trait NoteBackend: Send + Sync {
    /// Short name used in logs and the run report, e.g. `siliconflow`.
    fn name(&self) -> &str;

    /// Make one call and return the text of the first choice.
    async fn complete(&self, conversation: &Conversation) -> Result<String, BackendError>;
}

/// A backend plus retry budget plus prompts.
pub struct NoteGenerator {
    backend: Arc<dyn NoteBackend>,
    retry: RetryPolicy,
    system_prompt: String,
    instruction: String,
}

impl std::fmt::Debug for NoteGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteGenerator")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl NoteGenerator {
    pub fn new(backend: Arc<dyn NoteBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            system_prompt: LITERATURE_NOTE_PROMPT.to_string(),
            instruction: USER_INSTRUCTION.to_string(),
        }
    }

    /// Replace the built-in template and/or user instruction.
    pub fn with_prompts(mut self, system_prompt: Option<&str>, instruction: Option<&str>) -> Self {
        if let Some(p) = system_prompt {
            self.system_prompt = p.to_string();
        }
        if let Some(i) = instruction {
            self.instruction = i.to_string();
        }
        self
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Summarise `content` and write the note to `dest`.
    pub async fn generate(&self, content: &str, dest: &Path) -> Result<(), GenerateError> {
        let name = self.name();
        let conversation =
            Conversation::literature_note(&self.system_prompt, content, &self.instruction);
        debug!(
            "{name}: sending {} turns, {} chars",
            conversation.turns.len(),
            conversation.total_chars()
        );

        let backend = &self.backend;
        let conversation = &conversation;
        let note = self
            .retry
            .run(
                name,
                move |_| async move {
                    match backend.complete(conversation).await {
                        Ok(text) if text.trim().is_empty() => {
                            Err(BackendError::transient(backend.name(), "empty completion"))
                        }
                        other => other,
                    }
                },
                BackendError::is_retryable,
            )
            .await
            .map_err(|e| GenerateError::Backend {
                generator: name.to_string(),
                attempts: e.attempts,
                source: e.last_error,
            })?;

        write_note(dest, &note)
            .await
            .map_err(|source| GenerateError::WriteFailed {
                generator: name.to_string(),
                source,
            })?;
        info!("{name}: wrote {} ({} chars)", dest.display(), note.len());
        Ok(())
    }
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a
/// reader never sees a half-written note.
pub async fn write_note(path: &Path, contents: &str) -> Result<(), Pdf2NoteError> {
    let write_err = |source| Pdf2NoteError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Generators tried in order on the same content.
#[derive(Debug, Default)]
pub struct FallbackChain {
    generators: Vec<NoteGenerator>,
}

impl FallbackChain {
    pub fn new(generators: Vec<NoteGenerator>) -> Self {
        Self { generators }
    }

    pub fn names(&self) -> Vec<&str> {
        self.generators.iter().map(NoteGenerator::name).collect()
    }

    /// Try each generator until one writes the note. Returns the name of the
    /// generator that succeeded, or every generator's error in order.
    ///
    /// `on_attempt` is called with a generator's name before it runs.
    pub async fn generate(
        &self,
        content: &str,
        dest: &Path,
        on_attempt: impl Fn(&str),
    ) -> Result<&str, Vec<GenerateError>> {
        let mut failures = Vec::new();
        for generator in &self.generators {
            on_attempt(generator.name());
            match generator.generate(content, dest).await {
                Ok(()) => return Ok(generator.name()),
                Err(e) => {
                    warn!("{e}");
                    failures.push(e);
                }
            }
        }
        Err(failures)
    }

    /// Build the chain named by `config.generators`.
    ///
    /// Fails with [`Pdf2NoteError::ProviderNotConfigured`] when a listed
    /// generator has no credentials.
    pub fn from_config(config: &RunConfig) -> Result<Self, Pdf2NoteError> {
        let mut generators = Vec::with_capacity(config.generators.len());
        for kind in &config.generators {
            let backend = build_backend(*kind, config)?;
            generators.push(
                NoteGenerator::new(backend, config.retry).with_prompts(
                    config.system_prompt.as_deref(),
                    config.user_instruction.as_deref(),
                ),
            );
        }
        Ok(Self::new(generators))
    }
}

fn build_backend(
    kind: GeneratorKind,
    config: &RunConfig,
) -> Result<Arc<dyn NoteBackend>, Pdf2NoteError> {
    match kind {
        GeneratorKind::SiliconFlow => {
            let key = config.siliconflow_key.as_deref().ok_or_else(|| {
                Pdf2NoteError::ProviderNotConfigured {
                    provider: kind.to_string(),
                    hint: "Set `siliconflow_key` in the config file.".to_string(),
                }
            })?;
            let backend = SiliconFlowBackend::new(
                key,
                config.siliconflow.clone(),
                config.request_timeout,
            )?;
            Ok(Arc::new(backend))
        }
        GeneratorKind::Moonshot => {
            let backend = match &config.provider {
                Some(llm) => ProviderBackend::new(kind.as_str(), Arc::clone(llm), &config.moonshot),
                None => {
                    let key = config.moonshot_api_key.as_deref().ok_or_else(|| {
                        Pdf2NoteError::ProviderNotConfigured {
                            provider: kind.to_string(),
                            hint: "Set `moonshot_api_key` in the config file.".to_string(),
                        }
                    })?;
                    ProviderBackend::from_settings(kind.as_str(), key, &config.moonshot)?
                }
            };
            Ok(Arc::new(backend))
        }
    }
}
