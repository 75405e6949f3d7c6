//! Integration tests for `OpenAiClient` against a mock chat-completions endpoint.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use premwatch_core::ErrorKind;
use premwatch_scraper::{AiError, AiExtractor, OpenAiClient, LICENCE_SCHEMA};

fn test_client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_base_url("sk-test", "gpt-4o-mini", 5, &format!("{}/v1", server.uri()))
        .expect("failed to build test OpenAiClient")
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn returns_parsed_content_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini", "temperature": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"licences":[{"premises_name":"The Crown","postcode":"SW1A 1AA"}]}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let value = test_client(&server)
        .extract_structured("The Crown, SW1A 1AA", &LICENCE_SCHEMA)
        .await
        .expect("extraction should succeed");
    assert_eq!(value["licences"][0]["premises_name"], "The Crown");
}

#[tokio::test]
async fn server_error_maps_to_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .extract_structured("text", &LICENCE_SCHEMA)
        .await
        .unwrap_err();
    assert!(
        matches!(err, AiError::UnexpectedStatus { status: 503, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
}

#[tokio::test]
async fn non_json_content_maps_to_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("Sorry, I cannot help with that.")),
        )
        .mount(&server)
        .await;

    let err = test_client(&server)
        .extract_structured("text", &LICENCE_SCHEMA)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Deserialize { .. }), "unexpected error: {err:?}");
    assert_eq!(err.kind(), ErrorKind::ParseFailure);
}

#[tokio::test]
async fn missing_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = test_client(&server)
        .extract_structured("text", &LICENCE_SCHEMA)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::MalformedResponse(_)), "unexpected error: {err:?}");
}
