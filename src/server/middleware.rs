//! Request telemetry middleware.
//!
//! Runs around every route: measures latency, then hands a
//! [`RequestRecord`] to the stats recorder on a detached task so the response
//! is never held up by the write.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use super::AppState;
use crate::stats::RequestRecord;

pub async fn record_request(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let path = normalize_path(req.uri().path(), &state.base_path);
    let ip = client_ip(
        req.headers(),
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
    );
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    let mut record = RequestRecord::new(path, method, response.status().as_u16(), latency_ms);
    if let Some(ip) = ip {
        record = record.ip(ip);
    }
    if let Some(ua) = user_agent {
        record = record.user_agent(ua);
    }

    let stats = state.huginn.stats.clone();
    tokio::spawn(async move { stats.log_request(record).await });

    response
}

/// Endpoint path as stored in statistics: base path removed, no trailing
/// slash, never empty.
pub fn normalize_path(path: &str, base_path: &str) -> String {
    let stripped = if base_path.is_empty() {
        path
    } else {
        match path.strip_prefix(base_path) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => path,
        }
    };
    let trimmed = stripped.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Client address: first `X-Forwarded-For` entry, else the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}
