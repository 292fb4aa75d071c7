//! Prompt templates for AI judgments.
//!
//! Provider-agnostic; the gateway only sees the rendered messages.

use crate::gateway::Message;

/// Rendered prompt ready for the provider.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// A prompt template with a `{context}` placeholder in the user message.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl PromptTemplate {
    /// Render for a merged situation context (see [`crate::judge::combine_context`]).
    pub fn render(&self, context: &str) -> PromptInstance {
        PromptInstance {
            template_slug: self.slug.to_string(),
            system: self.system.trim().to_string(),
            user: self.user.replace("{context}", context.trim()),
        }
    }
}

pub const JUDGE_PROMPT_V1: PromptTemplate = PromptTemplate {
    slug: "aita_v1",
    system: r#"You are a fair and honest judge for "Am I the Asshole?" scenarios. Your priority is accuracy and truthfulness. Be direct, clear, and thoughtful in your analysis. Consider all perspectives and context. Use engaging but respectful language. Always determine if the person is the asshole (YTA) or not (NTA). Then provide a score from 1-10 where 1 means definitely not the asshole and 10 means definitely the asshole. Format your response as: YTA/NTA [score]/10 - [your clear, honest reasoning]. Be fair, accurate, and helpful."#,
    user: "Analyze this situation carefully and determine if they are the asshole: {context}\n\nConsider all perspectives and context. Respond with: YTA or NTA, then a score 1-10, then your clear, honest reasoning. Be fair and accurate.",
};

pub const DEFAULT_PROMPT: PromptTemplate = JUDGE_PROMPT_V1;

/// Generation cap for a judgment answer.
pub const JUDGE_MAX_OUTPUT_TOKENS: u32 = 250;

/// Sampling temperature for a judgment answer.
pub const JUDGE_TEMPERATURE: f32 = 0.7;
