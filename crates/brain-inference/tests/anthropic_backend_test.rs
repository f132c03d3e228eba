//! HTTP-level tests for the Anthropic backend and summarizer.

use std::sync::Arc;

use brain_core::{ContentType, Error, GenerationBackend};
use brain_inference::anthropic::{AnthropicBackend, AnthropicConfig, ANTHROPIC_VERSION};
use brain_inference::{Summarizer, SummaryRequest};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> AnthropicConfig {
    AnthropicConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        model: "claude-test".to_string(),
        max_tokens: 500,
        timeout_seconds: 5,
    }
}

fn message_response(text: &str) -> serde_json::Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-test",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 5}
    })
}

#[tokio::test]
async fn test_generation_sends_auth_and_version_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", ANTHROPIC_VERSION))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(json!({
            "model": "claude-test",
            "max_tokens": 500,
            "system": "be brief",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(config(&server)).expect("Failed to create backend");
    let reply = backend.generate_with_system("be brief", "hello").await;

    assert_eq!(reply.unwrap(), "hi there");
}

#[tokio::test]
async fn test_error_status_maps_to_inference_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })))
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(config(&server)).unwrap();
    let err = backend.generate("hello").await.unwrap_err();

    match err {
        Error::Inference(msg) => assert!(msg.contains("Overloaded")),
        other => panic!("Expected Inference error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_config_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(config(&server)).unwrap();
    assert!(matches!(
        backend.generate("hello").await,
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn test_summarizer_end_to_end_over_http() {
    let server = MockServer::start().await;

    let model_text = "```json\n{\"summary\": \"สรุป\", \"suggestedTags\": [\"อาหาร\"], \"suggestedCategory\": \"recipe\"}\n```";
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_response(model_text)))
        .expect(1)
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(config(&server)).unwrap();
    let summarizer = Summarizer::new(Arc::new(backend));

    let result = summarizer
        .summarize(&SummaryRequest {
            content: "ต้มยำกุ้ง".to_string(),
            content_type: ContentType::Text,
            title: None,
            link_preview: None,
        })
        .await;

    assert_eq!(result.summary, "สรุป");
    assert_eq!(result.suggested_tags, vec!["อาหาร"]);
    assert_eq!(result.suggested_category.as_deref(), Some("recipe"));
}

#[tokio::test]
async fn test_summarizer_server_error_yields_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let summarizer = Summarizer::new(Arc::new(AnthropicBackend::new(config(&server)).unwrap()));
    let result = summarizer
        .summarize(&SummaryRequest {
            content: "x".to_string(),
            content_type: ContentType::Text,
            title: None,
            link_preview: None,
        })
        .await;

    assert!(result.is_empty());
}
