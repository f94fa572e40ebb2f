//! Router tests driven through `tower::ServiceExt::oneshot`.

#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use huginn::providers::{ChatProvider, ModelCatalog};
use huginn::server::{AppState, LiveStreamConfig, router};
use huginn::stats::{StatsConfig, StatsSnapshot};
use huginn::types::{Completion, CompletionRequest, Usage};
use huginn::{Huginn, Result};

// ============================================================================
// Fixtures
// ============================================================================

struct EchoProvider {
    catalog: ModelCatalog,
}

#[async_trait]
impl ChatProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    async fn complete(&self, request: &CompletionRequest, model: &str) -> Result<Completion> {
        Ok(Completion {
            content: format!("echo: {}", request.message),
            model: model.to_string(),
            usage: Some(Usage::new(1, 2)),
        })
    }
}

fn huginn(upstream: Option<&MockServer>) -> Huginn {
    // Short snapshot TTL: a snapshot computed while a write is in flight
    // must not hide that write for long.
    let mut builder = Huginn::builder()
        .stats_config(StatsConfig::new().snapshot_ttl(Duration::from_millis(10)))
        .openai_compat("openai", None)
        .provider(Arc::new(EchoProvider {
            catalog: ModelCatalog::new("echo-1", ["echo-2"]),
        }));
    if let Some(server) = upstream {
        builder = builder
            .rates_base_url(server.uri())
            .company_registry(Some(server.uri()), None);
    }
    builder.build().unwrap()
}

fn app(huginn: &Huginn) -> Router {
    router(AppState::new(huginn.clone()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Telemetry is written on a detached task; poll until it lands.
async fn wait_for_requests(huginn: &Huginn, n: u64) -> StatsSnapshot {
    for _ in 0..100 {
        let snapshot = huginn.stats.stats().await;
        if snapshot.total_requests >= n {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {n} recorded requests");
}

// ============================================================================
// Stats
// ============================================================================

#[tokio::test]
async fn empty_stats_are_wrapped_in_data_envelope() {
    let huginn = huginn(None);
    let (status, body) = send(&app(&huginn), get("/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalRequests"], 0);
    assert_eq!(body["data"]["successRate"], 100.0);
    assert_eq!(body["data"]["topEndpoints"], json!([]));
}

#[tokio::test]
async fn every_request_is_recorded_once() {
    let huginn = huginn(None);
    let app = app(&huginn);

    send(&app, get("/stats")).await;
    send(&app, get("/stats/")).await;
    send(&app, get("/does-not-exist")).await;

    let snapshot = wait_for_requests(&huginn, 3).await;
    assert_eq!(snapshot.total_requests, 3);
    let stats_row = snapshot
        .top_endpoints
        .iter()
        .find(|e| e.path == "/stats")
        .unwrap();
    assert_eq!(stats_row.requests, 2, "trailing slash is normalized away");
    let missing = snapshot
        .top_endpoints
        .iter()
        .find(|e| e.path == "/does-not-exist")
        .unwrap();
    assert_eq!(missing.errors, 1);
}

#[tokio::test]
async fn base_path_is_stripped_before_recording() {
    let huginn = huginn(None);
    let app = router(AppState::new(huginn.clone()).with_base_path("/api"));

    let (status, _) = send(&app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/elsewhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let snapshot = wait_for_requests(&huginn, 2).await;
    let paths: Vec<_> = snapshot.top_endpoints.iter().map(|e| e.path.as_str()).collect();
    assert!(paths.contains(&"/stats"));
    assert!(paths.contains(&"/elsewhere"));
    assert!(!paths.contains(&"/api/stats"));
}

#[tokio::test]
async fn forwarded_for_is_recorded_as_client_ip() {
    let huginn = huginn(None);
    let request = Request::get("/stats")
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .header(header::USER_AGENT, "probe/1.0")
        .body(Body::empty())
        .unwrap();
    send(&app(&huginn), request).await;

    wait_for_requests(&huginn, 1).await;
    let live = huginn.stats.live().await.unwrap();
    assert_eq!(live.recent[0].ip.as_deref(), Some("198.51.100.4"));
    assert_eq!(live.recent[0].user_agent.as_deref(), Some("probe/1.0"));
}

#[tokio::test]
async fn reset_confirms_and_clears() {
    let huginn = huginn(None);
    let app = app(&huginn);
    send(&app, get("/stats")).await;
    wait_for_requests(&huginn, 1).await;

    let (status, body) = send(&app, post_json("/stats/reset", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"data": {"message": "Statistics reset"}}));

    // The reset request itself may land afterwards; nothing older survives.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(huginn.stats.stats().await.total_requests <= 1);
}

#[tokio::test]
async fn endpoint_activity_for_unknown_path_is_404() {
    let huginn = huginn(None);
    let (status, body) = send(&app(&huginn), get("/stats/endpoint?path=/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn endpoint_activity_requires_path() {
    let huginn = huginn(None);
    let (status, body) = send(&app(&huginn), get("/stats/endpoint")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

async fn collect_live_stream(full_every: u64) -> String {
    let huginn = huginn(None);
    let app = router(AppState::new(huginn).with_live(LiveStreamConfig {
        interval: Duration::from_millis(20),
        full_every,
        max_duration: Duration::from_millis(150),
    }));

    let response = app.oneshot(get("/stats/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        axum::body::to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .expect("stream should close after its duration limit")
    .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn live_stream_emits_live_stats_and_reconnect() {
    let text = collect_live_stream(2).await;

    // one live event per tick, plus a snapshot on every second tick
    let ticks = text.matches("event: live").count();
    assert!(ticks >= 2, "{text}");
    assert_eq!(text.matches("event: stats").count(), ticks / 2, "{text}");
    assert!(text.contains("requestsLastMinute"), "{text}");
    assert!(text.trim_end().ends_with("data: stream duration limit reached"), "{text}");
    assert_eq!(text.matches("event: reconnect").count(), 1);
}

#[tokio::test]
async fn live_stream_snapshot_on_every_tick_keeps_live_events() {
    let text = collect_live_stream(1).await;

    let ticks = text.matches("event: live").count();
    assert!(ticks >= 1, "{text}");
    assert_eq!(text.matches("event: stats").count(), ticks, "{text}");
    assert!(!text.contains("event: error"), "{text}");
}

// ============================================================================
// AI
// ============================================================================

#[tokio::test]
async fn chat_reports_routing() {
    let huginn = huginn(None);
    let (status, body) = send(
        &app(&huginn),
        post_json("/ai/chat", json!({"message": "ping", "max_tokens": 50})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["content"], "echo: ping");
    assert_eq!(data["provider"], "echo");
    assert_eq!(data["routing"]["primary_provider"], "openai");
    assert_eq!(data["routing"]["used_provider"], "echo");
    assert_eq!(data["routing"]["fallback_used"], true);
    assert_eq!(
        data["routing"]["fallback_reason"],
        "openai: credentials not configured"
    );
}

#[tokio::test]
async fn pinned_model_is_passed_through() {
    let huginn = huginn(None);
    let (status, body) = send(
        &app(&huginn),
        post_json(
            "/ai/code",
            json!({"prompt": "fizzbuzz", "language": "rust", "provider": "echo", "model": "echo-2"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model"], "echo-2");
    assert_eq!(body["data"]["routing"]["fallback_used"], false);
}

#[tokio::test]
async fn invalid_ai_input_is_400_with_error_envelope() {
    let huginn = huginn(None);
    let app = app(&huginn);

    let (status, body) = send(&app, post_json("/ai/chat", json!({"message": "hi", "temperature": 2.5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
    assert!(body["error"]["message"].as_str().unwrap().contains("temperature"));

    let (status, body) = send(&app, post_json("/ai/summarize", json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");

    let (status, body) = send(&app, post_json("/ai/translate", json!({"text": "hola"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing target: {body}");

    let request = Request::post("/ai/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn model_without_provider_is_rejected() {
    let huginn = huginn(None);
    let (status, _) = send(
        &app(&huginn),
        post_json("/ai/chat", json!({"message": "hi", "model": "echo-2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn providers_are_listed_in_chain_order() {
    let huginn = huginn(None);
    let (status, body) = send(&app(&huginn), get("/ai/providers")).await;

    assert_eq!(status, StatusCode::OK);
    let providers = body["data"]["providers"].as_array().unwrap();
    assert_eq!(providers[0]["name"], "openai");
    assert_eq!(providers[0]["configured"], false);
    assert_eq!(providers[1]["name"], "echo");
    assert_eq!(providers[1]["default_model"], "echo-1");
    assert_eq!(providers[1]["models"], json!(["echo-1", "echo-2"]));
    assert_eq!(body["data"]["deadline_secs"], Value::Null);
}

// ============================================================================
// Adapters
// ============================================================================

#[tokio::test]
async fn rates_route_serves_adapter_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "base": "EUR", "date": "2024-05-17", "rates": {"USD": 1.08}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let huginn = huginn(Some(&server));
    let app = app(&huginn);
    for _ in 0..2 {
        let (status, body) = send(&app, get("/rates/eur")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["rates"]["USD"], 1.08);
    }
}

#[tokio::test]
async fn company_route_maps_upstream_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/company/00000404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/company/00000500"))
        .respond_with(ResponseTemplate::new(500).set_body_string("registry down"))
        .mount(&server)
        .await;

    let huginn = huginn(Some(&server));
    let app = app(&huginn);

    let (status, body) = send(&app, get("/company/00000404")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "upstream_error");

    let (status, body) = send(&app, get("/company/00000500")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "HTTP 500: registry down");

    let (status, body) = send(&app, get("/company/bad.id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_input");
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let huginn = huginn(None);
    let (status, body) = send(&app(&huginn), get("/nowhere")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
