//! Parsing free-text AI answers into judgments.
//!
//! Models are asked for `YTA/NTA [score]/10 - [reasoning]` but rarely follow
//! the format exactly, so every field has a fallback chain.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{JudgmentResult, Verdict};

/// Reasoning shorter than this (in chars) is not worth keeping.
const MIN_REASONING_CHARS: usize = 10;

static SCORE_OUT_OF_TEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*/\s*10").expect("Invalid N/10 regex"));
static SCORE_LABELED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)score[:\s]+(\d+)").expect("Invalid score label regex"));
static SCORE_BARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([1-9]|10)\b").expect("Invalid bare score regex"));

static AFTER_DASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-–—]\s*(.+)").expect("Invalid dash regex"));
static AFTER_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*(.+)").expect("Invalid colon regex"));

static STRIP_PATTERNS: Lazy<[Regex; 5]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)^(YTA|NTA)[:\s]*").expect("Invalid verdict strip regex"),
        Regex::new(r"(?i)\d+\s*/\s*10[:\s]*").expect("Invalid N/10 strip regex"),
        Regex::new(r"(?i)score[:\s]*\d+[:\s]*").expect("Invalid score strip regex"),
        Regex::new(r"(?i)here'?s why[:\s]*").expect("Invalid here's-why strip regex"),
        Regex::new(r"(?i)why[:\s]*").expect("Invalid why strip regex"),
    ]
});

/// Parse an AI answer. Total: every input yields a well-formed judgment.
pub fn parse_ai_response(raw: &str) -> JudgmentResult {
    let verdict = parse_verdict(raw);
    let score = parse_score(raw).unwrap_or_else(|| verdict.default_score() as i64);
    let reasoning = parse_reasoning(raw, verdict);
    JudgmentResult::new(verdict, score, reasoning)
}

/// `YTA` if the answer affirms it anywhere, otherwise `NTA`.
pub fn parse_verdict(raw: &str) -> Verdict {
    let upper = raw.to_uppercase();
    if upper.contains("YTA")
        || upper.contains("YOU'RE THE ASSHOLE")
        || upper.contains("YOU ARE THE ASSHOLE")
    {
        Verdict::Asshole
    } else {
        Verdict::NotAsshole
    }
}

/// First `N/10`, else `score: N`, else the first standalone 1..=10.
///
/// The value is not clamped here; oversized digit runs saturate.
pub fn parse_score(raw: &str) -> Option<i64> {
    [&*SCORE_OUT_OF_TEN, &*SCORE_LABELED, &*SCORE_BARE]
        .iter()
        .find_map(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().parse::<i64>().unwrap_or(i64::MAX))
}

/// Text after the first dash (or, lacking one, the first colon); else the
/// answer with verdict and score tokens stripped; else a canned sentence.
pub fn parse_reasoning(raw: &str, verdict: Verdict) -> String {
    let separated = AFTER_DASH
        .captures(raw)
        .or_else(|| AFTER_COLON.captures(raw))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim());

    if let Some(text) = separated {
        if text.chars().count() > MIN_REASONING_CHARS {
            return text.to_string();
        }
    }

    let mut stripped = raw.to_string();
    for re in STRIP_PATTERNS.iter() {
        stripped = re.replace(&stripped, "").into_owned();
    }
    let stripped = stripped.trim();

    if stripped.chars().count() < MIN_REASONING_CHARS {
        verdict.default_reasoning().to_string()
    } else {
        stripped.to_string()
    }
}
