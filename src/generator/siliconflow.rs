//! SiliconFlow chat-completions backend over plain HTTP.
//!
//! The request body is the OpenAI chat format plus SiliconFlow's sampling
//! extensions (`top_k`, `frequency_penalty`). Responses are classified as:
//!
//! | Response | Result |
//! |----------|--------|
//! | HTTP 429 | [`BackendError::RateLimited`] |
//! | switch code as HTTP status or body `code` | [`BackendError::ProviderSwitch`] |
//! | HTTP 200 with `choices[0].message.content` | the content |
//! | anything else | [`BackendError::Transient`] |

use super::{Conversation, NoteBackend, Turn};
use crate::config::SiliconFlowSettings;
use crate::error::{BackendError, Pdf2NoteError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "siliconflow";

/// Request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    frequency_penalty: f32,
    n: u32,
    stop: Vec<String>,
    messages: &'a [Turn],
}

pub struct SiliconFlowBackend {
    client: reqwest::Client,
    api_key: String,
    settings: SiliconFlowSettings,
}

impl std::fmt::Debug for SiliconFlowBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiliconFlowBackend")
            .field("api_key", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl SiliconFlowBackend {
    pub fn new(
        api_key: impl Into<String>,
        settings: SiliconFlowSettings,
        timeout: Duration,
    ) -> Result<Self, Pdf2NoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Pdf2NoteError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            settings,
        })
    }

    fn request<'a>(&'a self, conversation: &'a Conversation) -> ChatRequest<'a> {
        let s = &self.settings;
        ChatRequest {
            model: &s.model,
            stream: false,
            max_tokens: s.max_tokens,
            temperature: s.temperature,
            top_p: s.top_p,
            top_k: s.top_k,
            frequency_penalty: s.frequency_penalty,
            n: 1,
            stop: Vec::new(),
            messages: &conversation.turns,
        }
    }
}

#[async_trait]
impl NoteBackend for SiliconFlowBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn complete(&self, conversation: &Conversation) -> Result<String, BackendError> {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(conversation))
            .send()
            .await
            .map_err(|e| BackendError::transient(NAME, format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::transient(NAME, format!("reading body: {e}")))?;
        debug!("{NAME}: HTTP {status}, {} bytes", body.len());

        classify_response(status, &body, self.settings.switch_code)
    }
}

/// Map one HTTP response to a completion or a classified error.
pub fn classify_response(
    status: u16,
    body: &str,
    switch_code: i64,
) -> Result<String, BackendError> {
    let json: Option<Value> = serde_json::from_str(body).ok();
    let detail = || error_detail(json.as_ref(), body);

    if status == 429 {
        return Err(BackendError::RateLimited {
            provider: NAME.to_string(),
            detail: detail(),
        });
    }

    let body_code = json
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_i64);
    if i64::from(status) == switch_code || body_code == Some(switch_code) {
        return Err(BackendError::ProviderSwitch {
            provider: NAME.to_string(),
            code: switch_code,
            detail: detail(),
        });
    }

    if status != 200 {
        return Err(BackendError::transient(
            NAME,
            format!("HTTP {status}: {}", detail()),
        ));
    }

    json.as_ref()
        .and_then(|v| v.pointer("/choices/0/message/content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BackendError::transient(NAME, "response has no choices[0].message.content"))
}

/// The service's `message` field when present, else the start of the body.
fn error_detail(json: Option<&Value>, body: &str) -> String {
    if let Some(msg) = json.and_then(|v| v.get("message")).and_then(Value::as_str) {
        return msg.to_string();
    }
    let mut detail: String = body.chars().take(200).collect();
    if detail.is_empty() {
        detail.push_str("unknown error");
    }
    detail
}
