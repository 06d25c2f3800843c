//! Integration tests for the HTTP completion client.
//!
//! A one-shot TCP server stands in for the completion service.

use forge_llm::{CompletionClient, CompletionPrompt, LlmError, OllamaClient, OllamaConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one request with the given status line and body.
///
/// Returns the endpoint URL and a handle yielding the raw request body.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
        let content_length: usize = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&buf[header_end..]).into_owned()
    });

    (format!("http://{}/api/generate", addr), handle)
}

fn client_for(endpoint: &str) -> OllamaClient {
    OllamaClient::new(OllamaConfig::default().endpoint(endpoint).timeout(5)).unwrap()
}

#[tokio::test]
async fn test_successful_completion() {
    let (url, server) = serve_once("200 OK", r#"{"model":"llama3.1","response":"TEST(A, B) {}","done":true}"#).await;
    let client = client_for(&url);

    let request = CompletionPrompt::new("Generate tests").with_system("You write gtest");
    let text = client.complete(&request).await;

    assert_eq!(text.as_deref(), Some("TEST(A, B) {}"));

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["prompt"], "You write gtest\n\nGenerate tests");
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["options"]["max_tokens"], 4000);
}

#[tokio::test]
async fn test_server_error_is_empty_result() {
    let (url, _server) = serve_once("500 Internal Server Error", r#"{"error":"model not loaded"}"#).await;
    let client = client_for(&url);

    let request = CompletionPrompt::new("Generate tests");
    assert!(matches!(
        client.try_complete(&request).await,
        Err(LlmError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_server_error_swallowed_by_complete() {
    let (url, _server) = serve_once("503 Service Unavailable", "busy").await;
    let client = client_for(&url);

    assert_eq!(client.complete(&CompletionPrompt::new("x")).await, None);
}

#[tokio::test]
async fn test_malformed_body_is_empty_result() {
    let (url, _server) = serve_once("200 OK", r#"{"unexpected":"shape"}"#).await;
    let client = client_for(&url);

    assert_eq!(client.complete(&CompletionPrompt::new("x")).await, None);
}

#[tokio::test]
async fn test_malformed_body_keeps_decode_error() {
    let (url, _server) = serve_once("200 OK", "not json at all").await;
    let client = client_for(&url);

    match client.try_complete(&CompletionPrompt::new("x")).await {
        Err(LlmError::MalformedResponse(e)) => assert!(e.is_syntax()),
        other => panic!("expected a decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_completion_is_empty_result() {
    let (url, _server) = serve_once("200 OK", r#"{"response":"  "}"#).await;
    let client = client_for(&url);

    assert_eq!(client.complete(&CompletionPrompt::new("x")).await, None);
}

#[tokio::test]
async fn test_unreachable_service_is_empty_result() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}/api/generate", addr));
    assert_eq!(client.complete(&CompletionPrompt::new("x")).await, None);
}
