use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use aita_judge::gateway::openai::{ChatProvider, OpenAiCompatAdapter};
use aita_judge::gateway::{
    Attribution, ChatGateway, ChatRequest, FinishReason, GatewayConfig, Message, NoopUsageSink,
    ProviderError, ProviderGateway,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn adapter(server: &MockServer) -> OpenAiCompatAdapter {
    OpenAiCompatAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), "OpenAI")
        .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(
        "gpt-3.5-turbo",
        vec![Message::system("judge"), Message::user("I forgot her birthday")],
        Attribution::new("test"),
    )
    .max_tokens(250)
    .temperature(0.7)
}

#[tokio::test]
async fn parses_success_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-3.5-turbo", "max_tokens": 250 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "NTA 3/10 - Forgetting happens to everyone." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 9 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = adapter(&server).chat(&request()).await.unwrap();
    assert_eq!(resp.content, "NTA 3/10 - Forgetting happens to everyone.");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 12);
    assert_eq!(resp.output_tokens, 9);
}

#[tokio::test]
async fn missing_usage_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "YTA 8/10 - rude." } }]
        })))
        .mount(&server)
        .await;

    let resp = adapter(&server).chat(&request()).await.unwrap();
    assert_eq!(resp.input_tokens, 0);
    assert_eq!(resp.output_tokens, 0);
}

#[tokio::test]
async fn base_url_with_trailing_slash_hits_same_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "NTA" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = OpenAiCompatAdapter::with_config(
        "sk-test",
        format!("{}/v1/", server.uri()),
        Duration::from_secs(5),
        "Custom OpenAI-compatible",
    )
    .unwrap();
    let resp = adapter.chat(&request()).await.unwrap();
    assert_eq!(resp.content, "NTA");
    assert_eq!(adapter.name(), "Custom OpenAI-compatible");
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "slow down", "code": "rate_limit_exceeded" }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert_eq!(err.code(), "rate_limited");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn server_error_is_retryable_client_error_is_not() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 503, .. }));
    assert!(err.is_retryable());
    assert_eq!(err.http_status(), Some(503));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("x-request-id", "req-123")
                .set_body_json(json!({
                    "error": { "message": "bad key", "code": "invalid_api_key" }
                })),
        )
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(err.code(), "http_status");
    assert_eq!(err.request_id(), Some("req-123"));
    assert_eq!(err.provider_code(), Some("invalid_api_key"));
    assert_eq!(err.to_string(), "OpenAI returned HTTP 401: bad key");
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "   " }, "finish_reason": "stop" }]
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert_eq!(err.code(), "empty_response");
}

#[tokio::test]
async fn answers_opening_like_a_refusal_are_still_answers() {
    let server = MockServer::start().await;
    let content = "I can't believe they blamed you. NTA 2/10 - You did nothing wrong by leaving early.";

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": content }, "finish_reason": "stop" }]
        })))
        .mount(&server)
        .await;

    let resp = adapter(&server).chat(&request()).await.unwrap();
    assert_eq!(resp.content, content);
}

#[tokio::test]
async fn refusal_in_error_payload_is_refused() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": { "message": "I cannot help with that request." }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert_eq!(err.code(), "refused");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = adapter(&server).chat(&request()).await.unwrap_err();
    assert_eq!(err.code(), "malformed_response");
    assert!(!err.is_retryable());
}

struct FlipResponder {
    calls: Arc<AtomicUsize>,
    first: ResponseTemplate,
    second: ResponseTemplate,
}

impl Respond for FlipResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            self.first.clone()
        } else {
            self.second.clone()
        }
    }
}

fn flip_server_responses() -> (ResponseTemplate, ResponseTemplate) {
    let first = ResponseTemplate::new(500).set_body_json(json!({
        "error": { "message": "transient error", "code": "internal" }
    }));
    let second = ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "content": "NTA 2/10 - fine." }, "finish_reason": "stop" }]
    }));
    (first, second)
}

#[tokio::test]
async fn gateway_makes_a_single_attempt_by_default() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let (first, second) = flip_server_responses();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FlipResponder {
            calls: calls.clone(),
            first,
            second,
        })
        .mount(&server)
        .await;

    let gateway = ProviderGateway::new(adapter(&server), Arc::new(NoopUsageSink));
    let err = ChatGateway::chat(&gateway, request()).await.unwrap_err();
    assert_eq!(err.code(), "http_status");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.provider_name(), "OpenAI");
}

#[tokio::test]
async fn gateway_retries_retryable_errors_when_configured() {
    let server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let (first, second) = flip_server_responses();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(FlipResponder {
            calls: calls.clone(),
            first,
            second,
        })
        .mount(&server)
        .await;

    let gateway = ProviderGateway::with_config(
        adapter(&server),
        Arc::new(NoopUsageSink),
        GatewayConfig {
            max_retries: 1,
            retry_base_delay: Duration::from_millis(1),
        },
    );
    let resp = ChatGateway::chat(&gateway, request()).await.unwrap();
    assert_eq!(resp.content, "NTA 2/10 - fine.");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
