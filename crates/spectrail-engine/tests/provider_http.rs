//! HTTP provider tests against a local canned-response listener.
//!
//! The listener speaks just enough HTTP/1.1 to satisfy one request per
//! scripted response, which is all the retry-policy tests need.

mod common;

use common::{repo_fixture, store_with_task};
use spectrail_core::{ArtifactKind, WorkbenchError};
use spectrail_engine::llm::client::{ChatCompletion, HttpProvider};
use spectrail_engine::llm::config::ProviderConfig;
use spectrail_engine::llm::types::ChatMessage;
use spectrail_engine::workflows::plan::generate_plan;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn chat_body(content: &str) -> String {
    format!(r#"{{"choices":[{{"message":{{"content":"{content}","tool_calls":null}}}}]}}"#)
}

/// Serve one scripted response per incoming connection, then stop listening.
fn spawn_server(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_thread = Arc::clone(&hits);

    std::thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            hits_in_thread.fetch_add(1, Ordering::SeqCst);
            if read_full_request(&mut stream).is_some() {
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        }
    });

    (format!("http://{addr}/v1"), hits)
}

/// Read headers plus a content-length body. Returns None on a broken stream.
fn read_full_request(stream: &mut std::net::TcpStream) -> Option<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(())
}

fn provider_for(base_url: &str) -> HttpProvider {
    let settings: HashMap<String, String> = [
        ("api_key", "sk-test"),
        ("base_url", base_url),
        ("model", "gpt-4o"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    HttpProvider::new(ProviderConfig::from_settings(&settings).unwrap()).unwrap()
}

#[tokio::test]
async fn unauthorized_fails_generate_plan_without_retry() {
    let (base_url, hits) = spawn_server(vec![http_response(
        "401 Unauthorized",
        r#"{"error":{"message":"bad key"}}"#,
    )]);

    let repo = repo_fixture();
    let (store, project_id, task_id) = store_with_task(repo.path(), "auth check");
    store
        .set_settings(&[
            ("api_key".into(), "sk-invalid".into()),
            ("base_url".into(), base_url),
        ])
        .unwrap();

    let err = generate_plan(&store, &project_id, &task_id).await.unwrap_err();
    assert!(matches!(err, WorkbenchError::InvalidCredentials));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Run exists and is closed; only the seed messages persist; no artifact.
    let runs = store.list_runs(&task_id).unwrap();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].ended_at.is_some());
    let roles: Vec<String> = store
        .list_messages(&runs[0].id)
        .unwrap()
        .into_iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(roles, ["system", "user"]);
    assert!(store
        .latest_artifact(&task_id, ArtifactKind::PlanMd)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let (base_url, hits) = spawn_server(vec![
        http_response("500 Internal Server Error", r#"{"error":"flaky"}"#),
        http_response("200 OK", &chat_body("recovered")),
    ]);

    let provider = provider_for(&base_url);
    let turn = provider
        .complete(&[ChatMessage::user("ping")], &[])
        .await
        .unwrap();
    assert_eq!(turn.content.as_deref(), Some("recovered"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn bad_request_is_not_retried() {
    let (base_url, hits) = spawn_server(vec![http_response(
        "400 Bad Request",
        r#"{"error":{"message":"malformed"}}"#,
    )]);

    let provider = provider_for(&base_url);
    let err = provider
        .complete(&[ChatMessage::user("ping")], &[])
        .await
        .unwrap_err();
    match err {
        WorkbenchError::Provider { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("malformed"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn success_with_tool_calls_preserves_order() {
    let body = r#"{
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [
                    {"id": "a", "type": "function", "function": {"name": "list_files", "arguments": "{}"}},
                    {"id": "b", "type": "function", "function": {"name": "grep", "arguments": "{\"query\":\"x\"}"}}
                ]
            }
        }]
    }"#;
    let (base_url, _hits) = spawn_server(vec![http_response("200 OK", body)]);

    let provider = provider_for(&base_url);
    let turn = provider
        .complete(&[ChatMessage::user("ping")], &[])
        .await
        .unwrap();
    assert!(turn.has_tool_calls());
    let ids: Vec<&str> = turn.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}
