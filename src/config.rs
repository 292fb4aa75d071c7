//! Environment-driven configuration.
//!
//! The AI path is enabled only when `OPENAI_API_KEY` is set. Any
//! OpenAI-compatible endpoint can be used by pointing one of the base URL
//! variables at it.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DB_PATH: &str = "aita.sqlite";

/// Which flavor of OpenAI-compatible endpoint we are talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Nebius,
    Custom,
}

impl ProviderKind {
    /// Display name reported back to callers as `providerName`.
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Nebius => "Nebius",
            ProviderKind::Custom => "Custom OpenAI-compatible",
        }
    }
}

/// Settings for the AI completion provider.
#[derive(Clone)]
pub struct AiProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub kind: ProviderKind,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for AiProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiProviderConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AiProviderConfig {
    /// Read provider settings from the process environment.
    ///
    /// Returns `None` when no API key is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AiProviderConfig::from_env`] with an injectable lookup.
    ///
    /// `NEBUIS_API_BASE_URL` wins over `OPENAI_API_BASE_URL`. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY")?;

        let (base_url, kind) = if let Some(url) = get("NEBUIS_API_BASE_URL") {
            (url, ProviderKind::Nebius)
        } else if let Some(url) = get("OPENAI_API_BASE_URL") {
            (url, ProviderKind::Custom)
        } else {
            (DEFAULT_BASE_URL.to_string(), ProviderKind::OpenAi)
        };

        let model = get("AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout = get("AI_TIMEOUT_SECONDS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Some(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            kind,
            model,
            timeout,
        })
    }
}

/// Location of the submission database.
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("AITA_DB_PATH") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    PathBuf::from(DEFAULT_DB_PATH)
}
