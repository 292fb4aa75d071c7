//! Usage tracking via the UsageSink trait.
//!
//! The gateway logs all calls through a UsageSink. This decouples the gateway
//! from any specific storage backend:
//! - the CLI uses TracingUsageSink
//! - tests use NoopUsageSink or a recording sink of their own

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Status of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of a provider API call for logging.
#[derive(Debug, Clone)]
pub struct ProviderCallRecord {
    /// Provider name: "OpenAI", "Nebius", etc.
    pub provider: &'static str,
    /// Endpoint: "chat/completions".
    pub endpoint: &'static str,
    /// Model used.
    pub model: String,
    /// Input tokens consumed.
    pub input_tokens: u32,
    /// Output tokens generated.
    pub output_tokens: u32,
    /// Judgment this call belongs to.
    pub request_id: Uuid,
    /// User who made the request (if known).
    pub user_id: Option<i64>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Call status.
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// Which code path made this call.
    pub caller: &'static str,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
}

impl ProviderCallRecord {
    /// Create a new record with required fields, defaulting others.
    pub fn new(
        provider: &'static str,
        endpoint: &'static str,
        model: impl Into<String>,
        caller: &'static str,
        request_id: Uuid,
    ) -> Self {
        Self {
            provider,
            endpoint,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            request_id,
            user_id: None,
            latency_ms: 0,
            status: CallStatus::Success,
            error_code: None,
            caller,
            timestamp: Utc::now(),
        }
    }

    pub fn tokens(mut self, input: u32, output: u32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn latency(mut self, ms: u64) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Input plus output tokens; provider-reported counts can be arbitrary.
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }
}

/// Trait for recording provider call usage.
///
/// Implement this trait to customize where usage data is stored.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record a provider call. This should be fire-and-forget:
    /// failures should be logged but not propagated.
    async fn record(&self, record: ProviderCallRecord);
}

/// No-op usage sink that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: ProviderCallRecord) {}
}

/// Usage sink that emits one structured `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, record: ProviderCallRecord) {
        tracing::info!(
            target: "aita_judge::usage",
            provider = record.provider,
            endpoint = record.endpoint,
            model = %record.model,
            tokens = record.total_tokens(),
            latency_ms = record.latency_ms,
            status = record.status.as_str(),
            error_code = record.error_code.as_deref().unwrap_or(""),
            caller = record.caller,
            request_id = %record.request_id,
            "provider call"
        );
    }
}
