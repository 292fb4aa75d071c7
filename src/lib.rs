#![forbid(unsafe_code)]

//! # aita-judge
//!
//! Decides whether the author of a short interpersonal situation is
//! "the asshole" (YTA) or "not the asshole" (NTA), with a 1-10 severity
//! score and a short explanation.
//!
//! An OpenAI-compatible chat provider is tried first when one is configured.
//! Any failure on that path (no key, timeout, HTTP error, refusal, empty or
//! unparseable answer) falls back to a deterministic rule cascade, so a
//! judgment is always produced. Judged situations can be stored in SQLite
//! together with their authors, follow-up context and visibility flags.

pub mod config;
pub mod gateway;
pub mod judge;
pub mod prompts;
pub mod service;
pub mod store;

pub use config::{AiProviderConfig, ProviderKind};
pub use gateway::{Attribution, ChatGateway, ProviderError, ProviderGateway, UsageSink};
pub use judge::{Judge, JudgeSettings, JudgmentOutcome, JudgmentResult, Provenance, Verdict};
pub use service::{ServiceError, SubmissionService};
pub use store::{SqliteSubmissionStore, StoreError, SubmissionStore};
