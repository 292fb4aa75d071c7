//! Provider gateway for OpenAI-compatible chat completions.

pub mod error;
pub mod openai;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use openai::{ChatProvider, OpenAiCompatAdapter};
use usage::{CallStatus, ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::ProviderError;
pub use types::*;
pub use usage::{NoopUsageSink, TracingUsageSink, UsageSink};

#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Name reported as the judgment's `providerName`.
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for GatewayConfig {
    /// A single attempt: the judge falls back to rules instead of retrying.
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

pub struct ProviderGateway<U: UsageSinkTrait> {
    adapter: OpenAiCompatAdapter,
    usage_sink: Arc<U>,
    config: GatewayConfig,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }

    fn provider_name(&self) -> &'static str {
        self.adapter.name()
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        let adapter = OpenAiCompatAdapter::from_env()?;
        Ok(Self {
            adapter,
            usage_sink,
            config: GatewayConfig::default(),
        })
    }

    pub fn new(adapter: OpenAiCompatAdapter, usage_sink: Arc<U>) -> Self {
        Self::with_config(adapter, usage_sink, GatewayConfig::default())
    }

    pub fn with_config(
        adapter: OpenAiCompatAdapter,
        usage_sink: Arc<U>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            adapter,
            usage_sink,
            config,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.adapter.chat(&req).await {
                Ok(resp) => {
                    self.record_usage(&req, &resp, CallStatus::Success, None)
                        .await;
                    return Ok(resp);
                }
                Err(err) => {
                    let code = err.code().to_string();
                    self.record_usage(&req, &ChatResponse::empty(), CallStatus::Error, Some(code))
                        .await;

                    if !err.is_retryable() || attempt >= self.config.max_retries {
                        return Err(err);
                    }

                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    tracing::debug!(attempt, ?delay, error = %err, "retrying provider call");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        resp: &ChatResponse,
        status: CallStatus,
        error_code: Option<String>,
    ) {
        let record = ProviderCallRecord::new(
            self.adapter.name(),
            "chat/completions",
            req.model.as_str(),
            req.attribution.caller,
            req.attribution.request_id,
        )
        .tokens(resp.input_tokens, resp.output_tokens)
        .user(req.attribution.user_id)
        .latency(resp.latency.as_millis() as u64);

        let record = if status == CallStatus::Error {
            record.error(error_code.unwrap_or_else(|| "provider_error".to_string()))
        } else {
            record
        };

        self.usage_sink.record(record).await;
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let multiplier = 2u64.pow(attempt.min(5));
    base * multiplier as u32
}
