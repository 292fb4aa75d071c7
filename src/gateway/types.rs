//! Core types for the provider gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribution for usage records and log correlation.
///
/// Every request through the gateway carries attribution so we know:
/// - Which judgment it belongs to (request_id)
/// - Who made the request (user_id), if known
/// - Which code path triggered it (caller)
#[derive(Debug, Clone)]
pub struct Attribution {
    /// Correlates the provider call with the judgment that issued it.
    pub request_id: Uuid,
    /// User who initiated the request (if known).
    pub user_id: Option<i64>,
    /// Submission being judged or re-judged (if any).
    pub submission_id: Option<i64>,
    /// Which code path made this call, e.g. "judge::ai".
    pub caller: &'static str,
}

impl Attribution {
    pub fn new(caller: &'static str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            submission_id: None,
            caller,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_submission(mut self, submission_id: i64) -> Self {
        self.submission_id = Some(submission_id);
        self
    }
}

impl Default for Attribution {
    fn default() -> Self {
        Self::new("unknown")
    }
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Chat message role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request for chat completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model id as the provider knows it, e.g. "gpt-3.5-turbo".
    pub model: String,
    /// Messages in the conversation.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Attribution for usage records.
    pub attribution: Attribution,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, attribution: Attribution) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.0,
            max_tokens: None,
            attribution,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown(String),
}

impl From<Option<String>> for FinishReason {
    fn from(s: Option<String>) -> Self {
        match s.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Unknown(other.to_string()),
            None => FinishReason::Unknown("none".to_string()),
        }
    }
}

/// Response from chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated content.
    pub content: String,
    /// Input tokens consumed (0 when the provider omits usage).
    pub input_tokens: u32,
    /// Output tokens generated (0 when the provider omits usage).
    pub output_tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
}

impl ChatResponse {
    pub(crate) fn empty() -> Self {
        Self {
            content: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            latency: Duration::from_millis(0),
            finish_reason: FinishReason::Unknown("error".to_string()),
        }
    }
}
