use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a mock HTTP server that serves HTML content at the specified path.
///
/// Useful for testing page fetching and extraction end to end.
pub async fn mock_page_server(url_path: &str, html: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock LEI registry server.
///
/// Responds to GET requests at the lei-records path with the given records
/// wrapped in the registry's `{"data": [...]}` envelope.
pub async fn mock_registry_server(records: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;

    let body = serde_json::json!({ "data": records });

    Mock::given(method("GET"))
        .and(path("/api/v1/lei-records"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .insert_header("content-type", "application/vnd.api+json"),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock chat-completions server whose assistant message carries
/// the given content string.
///
/// Pass a JSON object string for the happy path, or arbitrary prose to
/// exercise non-JSON payload handling.
pub async fn mock_chat_server(message_content: &str) -> MockServer {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": message_content
            },
            "finish_reason": "stop"
        }]
    });

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that delays responses to simulate network
/// timeouts. The server waits `delay_ms` milliseconds before responding.
pub async fn mock_timeout_server(delay_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("delayed response")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&server)
        .await;

    server
}

/// Creates a mock HTTP server that returns the specified HTTP error status
/// code for every request.
pub async fn mock_error_server(status_code: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(status_code))
        .mount(&server)
        .await;

    server
}
