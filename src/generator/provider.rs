//! SDK-style backend: any `edgequake-llm` provider.
//!
//! Used for Moonshot, which speaks the OpenAI protocol. For the `openai`
//! provider the client is built directly from the configured key, base URL
//! and model, so nothing is read from or written to the process environment.
//! Other provider names go through [`ProviderFactory::create_llm_provider`]
//! and use that provider's usual credential variables. A pre-built provider
//! can be injected instead (tests, custom middleware).
//!
//! The SDK reports failures as error values, not status codes. Rate limits
//! are recognised from [`LlmError::RateLimited`] or, failing that, from the
//! error message.

use super::{Conversation, NoteBackend, Role};
use crate::config::MoonshotSettings;
use crate::error::{BackendError, Pdf2NoteError};
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, LLMProvider, LlmError, OpenAIProvider, ProviderFactory,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Provider name that is built in-process from the config values.
const OPENAI_COMPATIBLE: &str = "openai";

static RE_RATE_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b429\b|rate[ _-]?limit|too many requests").unwrap());

pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
}

impl std::fmt::Debug for ProviderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("name", &self.name)
            .field("provider", &"<dyn LLMProvider>")
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl ProviderBackend {
    /// Wrap an existing provider.
    pub fn new(
        name: impl Into<String>,
        provider: Arc<dyn LLMProvider>,
        settings: &MoonshotSettings,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            temperature: settings.temperature,
        }
    }

    /// Create the provider named in `settings` with `api_key`.
    pub fn from_settings(
        name: impl Into<String>,
        api_key: &str,
        settings: &MoonshotSettings,
    ) -> Result<Self, Pdf2NoteError> {
        let name = name.into();
        let provider: Arc<dyn LLMProvider> =
            if settings.provider.eq_ignore_ascii_case(OPENAI_COMPATIBLE) {
                let client = match &settings.base_url {
                    Some(url) => OpenAIProvider::compatible(api_key, url.as_str()),
                    None => OpenAIProvider::new(api_key),
                };
                Arc::new(client.with_model(&settings.model))
            } else {
                warn!(
                    "{name}: provider '{}' reads its credentials from its own environment \
                     variables; the configured key and base URL are not used",
                    settings.provider
                );
                ProviderFactory::create_llm_provider(&settings.provider, &settings.model)
                    .map_err(|e| Pdf2NoteError::ProviderNotConfigured {
                        provider: name.clone(),
                        hint: format!(
                            "Could not create '{}' provider for model '{}': {e}",
                            settings.provider, settings.model
                        ),
                    })?
            };
        Ok(Self::new(name, provider, settings))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }
}

#[async_trait]
impl NoteBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, BackendError> {
        let messages: Vec<ChatMessage> = conversation
            .turns
            .iter()
            .map(|t| match t.role {
                Role::System => ChatMessage::system(&t.content),
                Role::User => ChatMessage::user(&t.content),
            })
            .collect();

        let start = Instant::now();
        match self.provider.chat(&messages, Some(&self.options())).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    self.name,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(response.content)
            }
            Err(LlmError::RateLimited(detail)) => Err(BackendError::RateLimited {
                provider: self.name.clone(),
                detail,
            }),
            Err(e) => Err(classify_provider_error(&self.name, &e.to_string())),
        }
    }
}

/// Rate-limit errors are final for this backend; everything else is worth
/// another attempt.
pub fn classify_provider_error(provider: &str, message: &str) -> BackendError {
    if RE_RATE_LIMIT.is_match(message) {
        BackendError::RateLimited {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    } else {
        BackendError::transient(provider, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{FallbackChain, NoteGenerator};
    use crate::retry::RetryPolicy;
    use crate::GenerateError;
    use edgequake_llm::{ChatRole, LLMResponse, MockProvider};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Reply {
        Text(&'static str),
        RateLimited,
        Api(&'static str),
    }

    /// Records every chat request and answers from a script.
    struct Recording {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<(Vec<ChatMessage>, Option<f32>)>>,
    }

    impl Recording {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LLMProvider for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-model"
        }

        fn max_context_length(&self) -> usize {
            128_000
        }

        async fn complete(&self, prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], None).await
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.chat(&[ChatMessage::user(prompt)], Some(options)).await
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.and_then(|o| o.temperature)));
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Text(text)) => Ok(LLMResponse::new(text, "recording-model")),
                Some(Reply::RateLimited) => Err(LlmError::RateLimited("slow down".into())),
                Some(Reply::Api(msg)) => Err(LlmError::ApiError(msg.into())),
                None => Err(LlmError::ApiError("script exhausted".into())),
            }
        }
    }

    fn backend(provider: Arc<dyn LLMProvider>) -> ProviderBackend {
        ProviderBackend::new("moonshot", provider, &MoonshotSettings::default())
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::new(5, Duration::ZERO)
    }

    #[tokio::test]
    async fn complete_sends_turns_in_order_with_temperature() {
        let provider = Recording::new(vec![Reply::Text("# Note")]);
        let conversation = Conversation::literature_note("template", "paper text", "go");

        let note = backend(provider.clone()).complete(&conversation).await.unwrap();
        assert_eq!(note, "# Note");

        let requests = provider.requests.lock().unwrap();
        let (messages, temperature) = &requests[0];
        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::System, ChatRole::System, ChatRole::User]);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["template", "paper text", "go"]);
        assert_eq!(*temperature, Some(0.3));
    }

    #[tokio::test]
    async fn sdk_rate_limit_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.md");
        let provider = Recording::new(vec![Reply::RateLimited, Reply::Text("never")]);
        let gen = NoteGenerator::new(Arc::new(backend(provider.clone())), fast());

        let err = gen.generate("c", &dest).await.unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Backend {
                attempts: 1,
                source: BackendError::RateLimited { .. },
                ..
            }
        ));
        assert_eq!(provider.calls(), 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn sdk_transient_errors_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.md");
        let provider = Recording::new(vec![Reply::Api("HTTP 502"), Reply::Text("second try")]);
        let gen = NoteGenerator::new(Arc::new(backend(provider.clone())), fast());

        gen.generate("c", &dest).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "second try");
    }

    #[tokio::test]
    async fn mock_provider_serves_as_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.md");
        let primary = Recording::new(vec![Reply::Api("429 Too Many Requests")]);
        let mock = MockProvider::new();
        mock.add_response("note from mock").await;

        let chain = FallbackChain::new(vec![
            NoteGenerator::new(
                Arc::new(ProviderBackend::new(
                    "primary",
                    primary.clone(),
                    &MoonshotSettings::default(),
                )),
                fast(),
            ),
            NoteGenerator::new(Arc::new(backend(Arc::new(mock))), fast()),
        ]);

        let winner = chain.generate("paper", &dest, |_| {}).await.unwrap();
        assert_eq!(winner, "moonshot");
        assert_eq!(primary.calls(), 1);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "note from mock");
    }

    #[test]
    fn openai_compatible_provider_uses_configured_model() {
        let settings = MoonshotSettings::default();
        let backend = ProviderBackend::from_settings("moonshot", "sk-test", &settings).unwrap();
        assert_eq!(backend.name, "moonshot");
        assert_eq!(backend.provider.model(), "moonshot-v1-128k");
        assert_eq!(backend.temperature, 0.3);
    }

    #[test]
    fn rate_limit_messages() {
        for msg in [
            "HTTP 429: quota exceeded",
            "Rate limit reached for moonshot-v1-128k",
            "rate_limit_error",
            "Too Many Requests",
        ] {
            assert!(
                matches!(
                    classify_provider_error("moonshot", msg),
                    BackendError::RateLimited { .. }
                ),
                "{msg}"
            );
        }
    }

    #[test]
    fn other_messages_are_transient() {
        for msg in [
            "connection reset by peer",
            "HTTP 500 internal error",
            "request id 14290 failed",
            "context length exceeded",
        ] {
            assert!(classify_provider_error("moonshot", msg).is_retryable(), "{msg}");
        }
    }
}
