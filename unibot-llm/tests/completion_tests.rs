//! Wire-level tests for the completion client

use serde_json::json;
use std::time::Duration;
use unibot_core::{CompletionConfig, CompletionProvider, ErrorKind};
use unibot_llm::{format_prompt, CompletionClient, EMPTY_COMPLETION};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> CompletionConfig {
    CompletionConfig {
        api_url: format!("{}/api/v1/chat/completions", server.uri()),
        model: "test/model".to_string(),
        api_key: Some("sk-test".to_string()),
        timeout_seconds: 5,
        referer: Some("https://assistant.reva.edu.in".to_string()),
        ..CompletionConfig::default()
    }
}

#[tokio::test]
async fn test_request_shape_and_reply() {
    let server = MockServer::start().await;
    let prompt = format_prompt("What courses do you offer?", None);

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("x-title", "REVA Assistant"))
        .and(header("http-referer", "https://assistant.reva.edu.in"))
        .and(body_json(json!({
            "model": "test/model",
            "messages": [{"role": "user", "content": prompt}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "## Programs\n- B.Tech"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server)).unwrap();
    assert_eq!(client.model(), "test/model");

    let text = client.complete(&prompt).await.unwrap();
    assert_eq!(text, "## Programs\n- B.Tech");
}

#[tokio::test]
async fn test_error_status_surfaces_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"bad key"}"#))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server)).unwrap();
    let error = client.complete("hi").await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(error.status(), Some(401));
    assert_eq!(
        error.message(),
        r#"Completion API error: 401 - {"error":"bad key"}"#
    );
}

#[tokio::test]
async fn test_empty_choices_give_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server)).unwrap();
    assert_eq!(client.complete("hi").await.unwrap(), EMPTY_COMPLETION);
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = CompletionConfig {
        api_key: None,
        ..config_for(&server)
    };
    let client = CompletionClient::new(&config).unwrap();

    let error = client.complete("hi").await.unwrap_err();
    assert_eq!(error.message(), "Completion API key is not set.");
}

#[tokio::test]
async fn test_non_json_success_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&config_for(&server)).unwrap();
    assert_eq!(
        client.complete("hi").await.unwrap_err().kind(),
        ErrorKind::Parse
    );
}

#[tokio::test]
async fn test_slow_completion_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = CompletionConfig {
        timeout_seconds: 1,
        ..config_for(&server)
    };
    let client = CompletionClient::new(&config).unwrap();

    assert_eq!(
        client.complete("hi").await.unwrap_err().kind(),
        ErrorKind::Timeout
    );
}
