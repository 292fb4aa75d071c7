use std::sync::Arc;
use std::time::Duration;

use aita_judge::gateway::openai::OpenAiCompatAdapter;
use aita_judge::gateway::{
    Attribution, ChatGateway, ChatRequest, ChatResponse, FinishReason, NoopUsageSink,
    ProviderError, ProviderGateway,
};
use aita_judge::judge::{classify, Judge, JudgeSettings, Provenance, Verdict};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEED: u64 = 42;

fn wiremock_judge(server: &MockServer, timeout: Duration) -> Judge {
    let adapter = OpenAiCompatAdapter::with_config(
        "sk-test",
        server.uri(),
        Duration::from_secs(10),
        "OpenAI",
    )
    .unwrap();
    let gateway = ProviderGateway::new(adapter, Arc::new(NoopUsageSink));
    Judge::with_gateway(
        Arc::new(gateway),
        JudgeSettings::new("gpt-3.5-turbo").timeout(timeout),
    )
    .with_seed(SEED)
}

fn seeded_rules(situation: &str, follow_up: Option<&str>) -> aita_judge::JudgmentResult {
    classify(situation, follow_up, &mut StdRng::seed_from_u64(SEED))
}

/// Never answers until told to.
struct StalledGateway;

#[async_trait]
impl ChatGateway for StalledGateway {
    async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ChatResponse {
            content: "YTA 10/10 - too late to matter anyway".to_string(),
            input_tokens: 0,
            output_tokens: 0,
            latency: Duration::from_secs(3600),
            finish_reason: FinishReason::Stop,
        })
    }

    fn provider_name(&self) -> &'static str {
        "Stalled"
    }
}

#[tokio::test]
async fn ai_answer_is_parsed_and_attributed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "YTA 8/10 - You ate food that was clearly labeled as someone else's." },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let judge = wiremock_judge(&server, Duration::from_secs(5));
    assert!(judge.has_provider());
    let outcome = judge.judge("I ate my roommate's labeled leftovers", None).await;

    assert_eq!(outcome.provenance, Provenance::Ai);
    assert_eq!(outcome.provider_name.as_deref(), Some("OpenAI"));
    assert_eq!(outcome.provider_error, None);
    assert_eq!(outcome.verdict(), Verdict::Asshole);
    assert_eq!(outcome.score(), 8);
    assert_eq!(
        outcome.reasoning(),
        "You ate food that was clearly labeled as someone else's."
    );
}

#[tokio::test]
async fn server_error_falls_back_to_seeded_rules() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let situation = "I yelled at my sister for borrowing my car";
    let judge = wiremock_judge(&server, Duration::from_secs(5));
    let outcome = judge.judge(situation, None).await;

    assert_eq!(outcome.provenance, Provenance::Rules);
    assert_eq!(outcome.provider_name, None);
    assert!(outcome.provider_error.as_deref().unwrap_or("").contains("HTTP 500"));
    assert_eq!(outcome.result, seeded_rules(situation, None));
    assert_eq!(outcome.score(), 6);
}

#[tokio::test]
async fn slow_provider_times_out_into_rules() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({
                    "choices": [{ "message": { "content": "YTA 9/10 - late answer here" } }]
                })),
        )
        .mount(&server)
        .await;

    let situation = "I forgot to pick up my friend from the airport";
    let judge = wiremock_judge(&server, Duration::from_millis(100));
    let outcome = judge.judge(situation, None).await;

    assert_eq!(outcome.provenance, Provenance::Rules);
    assert!(outcome.provider_error.as_deref().unwrap_or("").contains("timeout"));
    assert_eq!(outcome.result, seeded_rules(situation, None));
    assert_eq!(outcome.verdict(), Verdict::NotAsshole);
    assert_eq!(outcome.score(), 3);
}

#[tokio::test]
async fn refusal_falls_back_with_follow_up_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "I can't judge this situation." }
        })))
        .mount(&server)
        .await;

    let situation = "I forgot the meeting";
    let follow_up = "Actually I skipped it on purpose and lied about it";
    let judge = wiremock_judge(&server, Duration::from_secs(5));
    let outcome = judge.judge(situation, Some(follow_up)).await;

    assert_eq!(outcome.provenance, Provenance::Rules);
    assert_eq!(
        outcome.provider_error.as_deref(),
        Some("refused: I can't judge this situation.")
    );
    assert_eq!(outcome.result, seeded_rules(situation, Some(follow_up)));
    assert_eq!(outcome.verdict(), Verdict::Asshole);
    assert_eq!(outcome.score(), 8);
}

#[tokio::test]
async fn reply_opening_with_i_cant_is_parsed_not_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "I can't believe they blamed you. NTA 2/10 - You did nothing wrong by leaving early." },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let judge = wiremock_judge(&server, Duration::from_secs(5));
    let outcome = judge.judge("I left the party early", None).await;

    assert_eq!(outcome.provenance, Provenance::Ai);
    assert_eq!(outcome.provider_error, None);
    assert_eq!(outcome.verdict(), Verdict::NotAsshole);
    assert_eq!(outcome.score(), 2);
    assert_eq!(outcome.reasoning(), "You did nothing wrong by leaving early.");
}

#[tokio::test]
async fn cancellation_falls_back_immediately() {
    let judge = Judge::with_gateway(
        Arc::new(StalledGateway),
        JudgeSettings::new("gpt-3.5-turbo").timeout(Duration::from_secs(3600)),
    )
    .with_seed(SEED);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let situation = "We went to the park and had ice cream";
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        judge.judge_with(situation, None, Attribution::new("test"), Some(&token)),
    )
    .await
    .expect("cancelled judgment should return promptly");

    assert_eq!(outcome.provenance, Provenance::Rules);
    assert_eq!(outcome.provider_error.as_deref(), Some("request cancelled"));
    assert_eq!(outcome.result, seeded_rules(situation, None));
    assert_eq!(outcome.score(), 5);
}

#[tokio::test]
async fn rules_only_judge_never_reports_a_provider() {
    let outcome = Judge::rules_only()
        .with_seed(SEED)
        .judge("I shared her nude photos with my friends", None)
        .await;

    assert_eq!(outcome.provenance, Provenance::Rules);
    assert_eq!(outcome.provider_name, None);
    assert_eq!(outcome.provider_error, None);
    assert_eq!(outcome.verdict(), Verdict::Asshole);
    assert_eq!(outcome.score(), 10);
}

#[tokio::test]
async fn outcome_serializes_with_camel_case_provenance_fields() {
    let outcome = Judge::rules_only()
        .with_seed(SEED)
        .judge("We went to the park", None)
        .await;
    let value = serde_json::to_value(&outcome).unwrap();

    assert_eq!(value["verdict"], "NTA");
    assert_eq!(value["score"], 5);
    assert_eq!(value["provenance"], "rules");
    assert!(value.get("providerName").is_none());
    assert!(value["reasoning"].as_str().is_some());
}
