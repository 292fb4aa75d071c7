//! Judgment value types.

use serde::{Deserialize, Serialize};

/// Lowest severity a judgment can carry.
pub const SCORE_MIN: u8 = 1;
/// Highest severity a judgment can carry.
pub const SCORE_MAX: u8 = 10;

/// Binary outcome of a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// "You're the asshole".
    #[serde(rename = "YTA")]
    Asshole,
    /// "Not the asshole".
    #[serde(rename = "NTA")]
    NotAsshole,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Asshole => "YTA",
            Verdict::NotAsshole => "NTA",
        }
    }

    /// Parse a stored verdict. Anything that is not `YTA` reads as `NTA`.
    pub fn from_str_lossy(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("YTA") {
            Verdict::Asshole
        } else {
            Verdict::NotAsshole
        }
    }

    /// Score used when an AI answer carries no recognizable number.
    pub fn default_score(self) -> u8 {
        match self {
            Verdict::Asshole => 7,
            Verdict::NotAsshole => 3,
        }
    }

    /// Reasoning used when an AI answer carries no usable explanation.
    pub fn default_reasoning(self) -> &'static str {
        match self {
            Verdict::Asshole => {
                "Based on the situation described, your actions were inappropriate and harmful to others."
            }
            Verdict::NotAsshole => {
                "Based on the situation described, your actions were reasonable and justified."
            }
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a judgment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Ai,
    Rules,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Ai => "ai",
            Provenance::Rules => "rules",
        }
    }
}

/// Verdict, severity and explanation for one situation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentResult {
    pub verdict: Verdict,
    /// Always within `[SCORE_MIN, SCORE_MAX]`.
    pub score: u8,
    pub reasoning: String,
}

impl JudgmentResult {
    /// Build a result, clamping the score into range.
    pub fn new(verdict: Verdict, score: i64, reasoning: impl Into<String>) -> Self {
        Self {
            verdict,
            score: clamp_score(score),
            reasoning: reasoning.into(),
        }
    }
}

/// A judgment annotated with its provenance, as handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgmentOutcome {
    #[serde(flatten)]
    pub result: JudgmentResult,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

impl JudgmentOutcome {
    pub fn from_ai(result: JudgmentResult, provider_name: impl Into<String>) -> Self {
        Self {
            result,
            provenance: Provenance::Ai,
            provider_name: Some(provider_name.into()),
            provider_error: None,
        }
    }

    pub fn from_rules(result: JudgmentResult, provider_error: Option<String>) -> Self {
        Self {
            result,
            provenance: Provenance::Rules,
            provider_name: None,
            provider_error,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.result.verdict
    }

    pub fn score(&self) -> u8 {
        self.result.score
    }

    pub fn reasoning(&self) -> &str {
        &self.result.reasoning
    }
}

/// Clamp any computed or parsed score into `[SCORE_MIN, SCORE_MAX]`.
pub fn clamp_score(score: i64) -> u8 {
    score.clamp(SCORE_MIN as i64, SCORE_MAX as i64) as u8
}

/// Merge a situation with optional follow-up context into one text.
///
/// Both the rules and the AI prompt see exactly this string. A blank
/// follow-up counts as no follow-up.
pub fn combine_context(situation: &str, follow_up: Option<&str>) -> String {
    match follow_up.filter(|extra| !extra.trim().is_empty()) {
        Some(extra) => format!("{situation}\n\nAdditional context: {extra}"),
        None => situation.to_string(),
    }
}
