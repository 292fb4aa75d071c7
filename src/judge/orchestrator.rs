//! Picks between the AI provider and the rule cascade.
//!
//! The AI path is a single bounded call. Anything that goes wrong on it
//! (timeout, transport, non-2xx, refusal, empty answer, cancellation) is
//! logged and answered by the rules instead; callers never see an error.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{AiProviderConfig, DEFAULT_TIMEOUT};
use crate::gateway::openai::OpenAiCompatAdapter;
use crate::gateway::{
    Attribution, ChatGateway, ChatRequest, ChatResponse, ProviderError, ProviderGateway,
    TracingUsageSink,
};
use crate::prompts::{PromptTemplate, DEFAULT_PROMPT, JUDGE_MAX_OUTPUT_TOKENS, JUDGE_TEMPERATURE};

use super::response::parse_ai_response;
use super::rules::classify_context;
use super::types::{combine_context, JudgmentOutcome, JudgmentResult};

/// Knobs for the AI call.
#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub model: String,
    /// Upper bound on the whole provider call, including retries.
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt: PromptTemplate,
}

impl JudgeSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: JUDGE_MAX_OUTPUT_TOKENS,
            temperature: JUDGE_TEMPERATURE,
            prompt: DEFAULT_PROMPT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Judgment orchestrator.
#[derive(Clone)]
pub struct Judge {
    gateway: Option<Arc<dyn ChatGateway>>,
    settings: Option<JudgeSettings>,
    seed: Option<u64>,
}

impl Judge {
    /// A judge that never calls out; every answer comes from the rules.
    pub fn rules_only() -> Self {
        Self {
            gateway: None,
            settings: None,
            seed: None,
        }
    }

    /// A judge that tries `gateway` first.
    pub fn with_gateway(gateway: Arc<dyn ChatGateway>, settings: JudgeSettings) -> Self {
        Self {
            gateway: Some(gateway),
            settings: Some(settings),
            seed: None,
        }
    }

    /// Build from resolved provider settings.
    ///
    /// A provider that cannot even be constructed is logged and the judge
    /// degrades to rules only.
    pub fn from_config(cfg: Option<&AiProviderConfig>) -> Self {
        let Some(cfg) = cfg else {
            info!("no AI provider configured; using rule-based judgments");
            return Self::rules_only();
        };

        match OpenAiCompatAdapter::from_config(cfg) {
            Ok(adapter) => {
                info!(provider = cfg.kind.name(), model = %cfg.model, base_url = %cfg.base_url, "AI provider configured");
                let gateway = ProviderGateway::new(adapter, Arc::new(TracingUsageSink));
                Self::with_gateway(
                    Arc::new(gateway),
                    JudgeSettings::new(cfg.model.clone()).timeout(cfg.timeout),
                )
            }
            Err(err) => {
                warn!(error = %err, "AI provider unusable; using rule-based judgments");
                Self::rules_only()
            }
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_config(AiProviderConfig::from_env().as_ref())
    }

    /// Fix the randomness used for rule responses.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether an AI provider will be tried.
    pub fn has_provider(&self) -> bool {
        self.gateway.is_some()
    }

    pub async fn judge(&self, situation: &str, follow_up: Option<&str>) -> JudgmentOutcome {
        self.judge_with(situation, follow_up, Attribution::new("judge"), None)
            .await
    }

    /// Judge with attribution and an optional caller-driven cancel signal.
    pub async fn judge_with(
        &self,
        situation: &str,
        follow_up: Option<&str>,
        attribution: Attribution,
        cancel: Option<&CancellationToken>,
    ) -> JudgmentOutcome {
        let context = combine_context(situation, follow_up);
        let request_id = attribution.request_id;

        let (gateway, settings) = match (&self.gateway, &self.settings) {
            (Some(g), Some(s)) => (g, s),
            _ => {
                let outcome = JudgmentOutcome::from_rules(self.rules(&context), None);
                log_outcome(&outcome, request_id);
                return outcome;
            }
        };

        let request = ChatRequest::new(
            settings.model.clone(),
            settings.prompt.render(&context).to_messages(),
            attribution,
        )
        .max_tokens(settings.max_tokens)
        .temperature(settings.temperature);

        let outcome = match call_provider(gateway.as_ref(), request, settings.timeout, cancel).await
        {
            Ok(resp) => {
                JudgmentOutcome::from_ai(parse_ai_response(&resp.content), gateway.provider_name())
            }
            Err(err) => {
                warn!(
                    provider = gateway.provider_name(),
                    code = err.code(),
                    error = %err,
                    %request_id,
                    "AI judgment failed; falling back to rules"
                );
                JudgmentOutcome::from_rules(self.rules(&context), Some(err.to_string()))
            }
        };

        log_outcome(&outcome, request_id);
        outcome
    }

    fn rules(&self, context: &str) -> JudgmentResult {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        classify_context(context, &mut rng)
    }
}

async fn call_provider(
    gateway: &dyn ChatGateway,
    request: ChatRequest,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<ChatResponse, ProviderError> {
    let bounded = async {
        match tokio::time::timeout(timeout, gateway.chat(request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout)),
        }
    };

    let resp = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(ProviderError::Cancelled),
                result = bounded => result,
            }
        }
        None => bounded.await,
    }?;

    if resp.content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse {
            provider: gateway.provider_name(),
        });
    }
    Ok(resp)
}

fn log_outcome(outcome: &JudgmentOutcome, request_id: uuid::Uuid) {
    info!(
        provenance = outcome.provenance.as_str(),
        verdict = outcome.verdict().as_str(),
        score = outcome.score(),
        %request_id,
        "judgment produced"
    );
}
