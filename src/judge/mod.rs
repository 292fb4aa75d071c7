//! Judgment API module.
//!
//! - `rules`: the deterministic tier cascade (with an injected RNG)
//! - `response`: turning free-text AI answers into judgments
//! - `orchestrator`: AI first, rules on any failure

pub mod orchestrator;
pub mod response;
pub mod rules;
pub mod types;

pub use orchestrator::{Judge, JudgeSettings};
pub use response::parse_ai_response;
pub use rules::{classify, classify_context, match_tier, Tier, TIERS};
pub use types::*;
