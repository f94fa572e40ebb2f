//! Tests for [`FetchClient`] error classification.

use std::time::Duration;

use serde::Deserialize;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huginn::http::DEFAULT_USER_AGENT;
use huginn::{FetchClient, FetchOptions, HuginnError};

#[derive(Debug, Deserialize, PartialEq)]
struct Pong {
    ok: bool,
}

#[tokio::test]
async fn json_success_with_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(query_param("q", "dogs"))
        .and(header("x-trace", "abc"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new().unwrap();
    let options = FetchOptions::new().query("q", "dogs").header("x-trace", "abc");
    let pong: Pong = client
        .get_json(&format!("{}/ping", server.uri()), &options)
        .await
        .unwrap();
    assert_eq!(pong, Pong { ok: true });
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(body_json(serde_json::json!({"name": "rex"})))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new().unwrap();
    let pong: Pong = client
        .post_json(
            &format!("{}/echo", server.uri()),
            &serde_json::json!({"name": "rex"}),
            &FetchOptions::new().bearer("tok"),
        )
        .await
        .unwrap();
    assert!(pong.ok);
}

#[tokio::test]
async fn error_status_carries_truncated_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418).set_body_string("x".repeat(2000)))
        .mount(&server)
        .await;

    let err = FetchClient::new()
        .unwrap()
        .get(&format!("{}/teapot", server.uri()), &FetchOptions::new())
        .await
        .unwrap_err();

    match err {
        HuginnError::Http { status, message } => {
            assert_eq!(status, 418);
            assert_eq!(message.len(), 512);
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_error_body_uses_reason_phrase() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = FetchClient::new()
        .unwrap()
        .get(&server.uri(), &FetchOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = FetchClient::new()
        .unwrap()
        .get_json::<Pong>(&server.uri(), &FetchOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::Decode(_)));
    assert_eq!(err.status_code(), 500);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = FetchClient::new()
        .unwrap()
        .get(
            &format!("http://127.0.0.1:{port}/"),
            &FetchOptions::new().timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::Transport(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn slow_upstream_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let err = FetchClient::new()
        .unwrap()
        .get(
            &server.uri(),
            &FetchOptions::new().timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, HuginnError::Transport(_)));
}
