// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the remote module.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::remote::*;
use fitsync_core::{ActionPayload, Collection};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use yare::parameterized;

#[parameterized(
    create_workout = { ActionPayload::create_workout("temp_1", json!({"name": "A"})), Method::Post, "/workouts" },
    update_workout = { ActionPayload::update_workout("w1", json!({})), Method::Put, "/workouts/w1" },
    create_exercise = { ActionPayload::create_exercise("temp_2", json!({})), Method::Post, "/exercises" },
    update_progress = { ActionPayload::update_progress("p1", json!({})), Method::Put, "/progress/p1" },
    update_profile = { ActionPayload::update_profile(json!({})), Method::Put, "/profile" },
    slash_in_id = { ActionPayload::update_progress("a/b", json!({})), Method::Put, "/progress/a%2Fb" },
    query_in_id = { ActionPayload::update_workout("x?y z", json!({})), Method::Put, "/workouts/x%3Fy%20z" },
)]
fn test_action_routes(payload: ActionPayload, method: Method, path: &str) {
    let request = RemoteRequest::for_action(&payload);
    assert_eq!(request.method, method);
    assert_eq!(request.path, path);
    assert_eq!(request.body.as_ref(), Some(payload.document()));
}

#[parameterized(
    workouts = { Collection::Workouts, "/workouts/recent" },
    exercises = { Collection::Exercises, "/exercises" },
    progress = { Collection::Progress, "/progress" },
    profile = { Collection::Profile, "/profile" },
)]
fn test_fetch_routes(collection: Collection, path: &str) {
    let request = RemoteRequest::fetch(collection);
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path, path);
    assert!(request.body.is_none());
}

#[parameterized(
    bad_request = { 400, false },
    unauthorized = { 401, false },
    not_found = { 404, false },
    conflict = { 409, false },
    unprocessable = { 422, false },
    request_timeout = { 408, true },
    too_many = { 429, true },
    server_error = { 500, true },
    unavailable = { 503, true },
)]
fn test_status_classification(status: u16, transient: bool) {
    assert_eq!(RemoteError::from_status(status, "msg").is_transient(), transient);
}

#[test]
fn test_request_display() {
    let request = RemoteRequest::for_action(&ActionPayload::update_profile(json!({})));
    assert_eq!(request.to_string(), "PUT /profile");
}

/// Serves one canned HTTP response and returns the raw request it received.
async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
            if request_complete(&received) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&received).into_owned()
    });

    (base_url, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    body.len() >= length
}

fn client(base_url: &str, token: Option<&str>) -> HttpRemote {
    HttpRemote::new(base_url, Duration::from_secs(5), token.map(String::from)).unwrap()
}

#[tokio::test]
async fn test_http_success_returns_json() {
    let (base_url, server) = serve_once(201, r#"{"id":"srv-1","name":"Legs"}"#).await;
    let remote = client(&format!("{base_url}/api/"), Some("secret"));

    let request = RemoteRequest::for_action(&ActionPayload::create_workout("temp_1", json!({"name": "Legs"})));
    let value = remote.execute(request).await.unwrap();

    assert_eq!(value, json!({"id": "srv-1", "name": "Legs"}));
    let received = server.await.unwrap();
    assert!(received.starts_with("POST /api/workouts HTTP/1.1"));
    assert!(received.to_lowercase().contains("authorization: bearer secret"));
    assert!(received.contains(r#""name":"Legs""#));
}

#[tokio::test]
async fn test_http_entity_id_is_escaped() {
    let (base_url, server) = serve_once(200, r#"{"id":"a/b?c"}"#).await;
    let remote = client(&base_url, None);

    let request = RemoteRequest::for_action(&ActionPayload::update_progress("a/b?c", json!({"weight": 80})));
    remote.execute(request).await.unwrap();

    let received = server.await.unwrap();
    assert!(received.starts_with("PUT /progress/a%2Fb%3Fc HTTP/1.1"), "{received}");
}

#[tokio::test]
async fn test_http_empty_body_is_null() {
    let (base_url, server) = serve_once(204, "").await;
    let remote = client(&base_url, None);

    let value = remote.execute(RemoteRequest::fetch(Collection::Profile)).await.unwrap();

    assert!(value.is_null());
    let received = server.await.unwrap();
    assert!(!received.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn test_http_client_error_is_rejection() {
    let (base_url, _server) = serve_once(400, "weight must be positive").await;
    let remote = client(&base_url, None);

    let err = remote
        .execute(RemoteRequest::for_action(&ActionPayload::update_progress("p1", json!({"weight": -1}))))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RemoteError::Rejected { status: 400, message: "weight must be positive".to_string() }
    );
}

#[tokio::test]
async fn test_http_server_error_is_transient() {
    let (base_url, _server) = serve_once(503, "").await;
    let remote = client(&base_url, None);

    let err = remote.execute(RemoteRequest::fetch(Collection::Exercises)).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_http_malformed_body_is_transient() {
    let (base_url, _server) = serve_once(200, "<html>proxy error</html>").await;
    let remote = client(&base_url, None);

    let err = remote.execute(RemoteRequest::fetch(Collection::Exercises)).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_http_connection_refused_is_transient() {
    let remote = client("http://127.0.0.1:1", None);
    let err = remote.execute(RemoteRequest::fetch(Collection::Workouts)).await.unwrap_err();
    assert!(err.is_transient());
}
