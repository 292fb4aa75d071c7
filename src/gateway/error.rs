//! Failures on the provider path.
//!
//! None of these reach a judgment's caller; the orchestrator logs the error,
//! keeps its message as `providerError` and answers with the rules.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx answer other than 429.
    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
        /// `error.code` from the body, e.g. "invalid_api_key".
        code: Option<String>,
        /// `x-request-id` response header.
        request_id: Option<String>,
    },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        retry_after: Duration,
        request_id: Option<String>,
    },

    /// Prompt exceeds the adapter's character cap; never sent.
    #[error("input too large: {chars} chars (max {max})")]
    InputTooLarge { chars: usize, max: usize },

    /// The provider's error payload says it declined to answer.
    #[error("refused: {0}")]
    Refused(String),

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: &'static str },

    /// 2xx answer that is not a usable completion.
    #[error("{provider} sent an unusable response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider,
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status >= 500,
            Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::InputTooLarge { .. }
            | Self::Refused(_)
            | Self::EmptyResponse { .. }
            | Self::Malformed { .. }
            | Self::Cancelled
            | Self::Config(_) => false,
        }
    }

    /// Short code for logs and usage records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status { .. } => "http_status",
            Self::RateLimited { .. } => "rate_limited",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::Refused(_) => "refused",
            Self::EmptyResponse { .. } => "empty_response",
            Self::Malformed { .. } => "malformed_response",
            Self::Timeout(_) => "timeout",
            Self::Cancelled => "cancelled",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config_error",
        }
    }

    /// HTTP status, when the provider answered with one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Status { request_id, .. } | Self::RateLimited { request_id, .. } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }

    /// Provider-specific error code from the response body.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
