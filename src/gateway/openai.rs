//! OpenAI-compatible adapter for chat completions.
//!
//! Works against OpenAI itself and any endpoint that speaks the same
//! `/chat/completions` dialect (Nebius, local servers, ...).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
use super::types::*;
use crate::config::{AiProviderConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

// =============================================================================
// TRAIT
// =============================================================================

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Human readable provider name.
    fn name(&self) -> &'static str;
}

// =============================================================================
// ADAPTER
// =============================================================================

/// Maximum allowed response body length (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

/// Maximum allowed input characters.
const MAX_INPUT_CHARS: usize = 100_000;

/// Suggested wait after a 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// OpenAI-compatible API adapter for chat completions.
#[derive(Debug, Clone)]
pub struct OpenAiCompatAdapter {
    client: reqwest::Client,
    base_url: String,
    name: &'static str,
}

impl OpenAiCompatAdapter {
    /// Create from API key against the default OpenAI endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, "OpenAI")
    }

    /// Create from resolved provider settings.
    pub fn from_config(cfg: &AiProviderConfig) -> Result<Self, ProviderError> {
        Self::with_config(&cfg.api_key, &cfg.base_url, cfg.timeout, cfg.kind.name())
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, ProviderError> {
        let cfg = AiProviderConfig::from_env()
            .ok_or_else(|| ProviderError::config("OPENAI_API_KEY not set"))?;
        Self::from_config(&cfg)
    }

    /// Create with custom configuration.
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        let base_url = base_url.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ProviderError::config("Invalid API key format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Extract request ID from response headers.
    fn extract_request_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Whether an `error` payload message says the provider declined.
    fn is_refusal(msg: &str) -> bool {
        let l = msg.trim_start().to_lowercase();
        let first_line = l.lines().next().unwrap_or("");

        const PREFIXES: &[&str] = &[
            "i cannot",
            "i can't",
            "i won't",
            "i will not",
            "i am unable to",
            "i'm unable to",
            "unable to comply",
            "unable to assist",
        ];

        PREFIXES.iter().any(|p| first_line.starts_with(p)) || l.contains("request was refused")
    }
}

// =============================================================================
// API TYPES
// =============================================================================

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: m.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Option<Vec<Choice>>,
    usage: Option<Usage>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    code: Option<String>,
}

// =============================================================================
// CHAT PROVIDER IMPL
// =============================================================================

#[async_trait]
impl ChatProvider for OpenAiCompatAdapter {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let total_chars: usize = req.messages.iter().map(|m| m.content.len()).sum();
        if total_chars > MAX_INPUT_CHARS {
            return Err(ProviderError::InputTooLarge {
                chars: total_chars,
                max: MAX_INPUT_CHARS,
            });
        }

        let start = Instant::now();

        let messages: Vec<ApiMessage> = req.messages.iter().map(ApiMessage::from).collect();

        let api_req = ChatApiRequest {
            model: &req.model,
            messages: &messages,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let mut response = self
            .client
            .post(self.chat_url())
            .json(&api_req)
            .send()
            .await?;

        let status = response.status();
        let request_id = Self::extract_request_id(response.headers());

        // Stream response to enforce size limit
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let new_len = bytes.len() + chunk.len();
            if new_len > MAX_RESPONSE_LEN {
                return Err(ProviderError::malformed(
                    self.name,
                    format!("response too large: {new_len} bytes"),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = String::from_utf8_lossy(&bytes).to_string();

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited {
                    retry_after: RATE_LIMIT_BACKOFF,
                    request_id,
                });
            }
            let api_error = serde_json::from_str::<ChatApiResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.error);
            let (message, code) = match api_error {
                Some(e) => (
                    e.message.unwrap_or_else(|| "no error details".to_string()),
                    e.code,
                ),
                None => ("no error details".to_string(), None),
            };
            return Err(ProviderError::Status {
                provider: self.name,
                status: status.as_u16(),
                message,
                code,
                request_id,
            });
        }

        let parsed: ChatApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::malformed(self.name, format!("invalid JSON: {e}")))?;

        if let Some(error) = parsed.error {
            let message = error.message.unwrap_or_default();
            if Self::is_refusal(&message) {
                return Err(ProviderError::Refused(message));
            }
            return Err(ProviderError::malformed(
                self.name,
                format!("error payload: {message}"),
            ));
        }

        let choice = parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| ProviderError::malformed(self.name, "no choices in response"))?;

        // Any non-empty text is an answer, even one that opens with
        // "I can't ..."; the parser decides what it says.
        let content = choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse {
                provider: self.name,
            });
        }

        // Usage is optional on many OpenAI-compatible servers.
        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.prompt_tokens.unwrap_or(0), u.completion_tokens.unwrap_or(0)))
            .unwrap_or((0, 0));

        Ok(ChatResponse {
            content,
            input_tokens,
            output_tokens,
            latency: start.elapsed(),
            finish_reason: FinishReason::from(choice.finish_reason),
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
