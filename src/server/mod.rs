//! HTTP surface for huginnd.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - The axum router and its shared state
//! - Request telemetry middleware feeding [`StatsRecorder`](crate::stats::StatsRecorder)
//! - The live statistics event stream
//!
//! Every route answers with the `{"data": ...}` envelope on success and the
//! `{"error": {"message", "code"}}` envelope on failure.

pub mod config;
mod middleware;
mod response;
mod routes;
mod sse;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::cache::{CacheConfig, CacheStore, MemoryCacheStore, SqliteCacheStore};
use crate::http::FetchClient;
use crate::providers::{
    AnthropicProvider, ChatProvider, ModelCatalog, OpenAiCompatProvider,
};
use crate::stats::SqliteStatsStore;
use crate::{Huginn, HuginnError, Result};

use config::{CacheBackend, Config, ProviderConfig, ProviderKind, Secrets, data_dir};

pub use middleware::{client_ip, normalize_path};
pub use response::ApiError;

/// Timing of the live statistics stream.
#[derive(Debug, Clone)]
pub struct LiveStreamConfig {
    /// Gap between events.
    pub interval: Duration,
    /// Every n-th event carries the full snapshot instead of the live one.
    pub full_every: u64,
    /// After this long the stream sends `reconnect` and closes.
    pub max_duration: Duration,
}

impl Default for LiveStreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            full_every: 10,
            max_duration: Duration::from_secs(300),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub huginn: Huginn,
    /// Normalized mount prefix (`""` or `/prefix`).
    pub base_path: String,
    pub live: LiveStreamConfig,
}

impl AppState {
    pub fn new(huginn: Huginn) -> Self {
        Self {
            huginn,
            base_path: String::new(),
            live: LiveStreamConfig::default(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_live(mut self, live: LiveStreamConfig) -> Self {
        self.live = live;
        self
    }
}

/// Build the axum router with all routes.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/stats", get(routes::stats))
        .route("/stats/reset", post(routes::reset_stats))
        .route("/stats/live", get(sse::live_stream))
        .route("/stats/endpoint", get(routes::endpoint_activity))
        .route("/ai/providers", get(routes::providers))
        .route("/ai/chat", post(routes::chat))
        .route("/ai/summarize", post(routes::summarize))
        .route("/ai/translate", post(routes::translate))
        .route("/ai/sentiment", post(routes::sentiment))
        .route("/ai/code", post(routes::code))
        .route("/company/{id}", get(routes::company))
        .route("/rates/{base}", get(routes::rates));

    let mounted = if state.base_path.is_empty() {
        api
    } else {
        Router::new().nest(&state.base_path, api)
    };

    mounted
        .fallback(routes::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::record_request,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Assemble a [`Huginn`] from file configuration and secrets.
pub fn build_huginn(config: &Config, secrets: &Secrets) -> Result<Huginn> {
    let client = FetchClient::new()?;
    let timeout = Duration::from_secs(config.server.limits.upstream_timeout_secs);

    let cache_store: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new(
            &CacheConfig::new().max_entries(config.cache.max_entries),
        )),
        CacheBackend::Sqlite => {
            let path = config
                .cache
                .path
                .clone()
                .unwrap_or_else(|| data_dir().join("cache.db"));
            Arc::new(SqliteCacheStore::open(&path)?)
        }
    };

    let stats_path = config
        .stats
        .path
        .clone()
        .unwrap_or_else(|| data_dir().join("stats.db"));
    let stats_store = Arc::new(SqliteStatsStore::open(&stats_path)?);

    let mut builder = Huginn::builder()
        .fetch_client(client.clone())
        .cache_store(cache_store)
        .stats_store(stats_store)
        .stats_config(config.stats.stats_config())
        .routing(config.routing.clone())
        .company_registry(
            config.adapters.company_registry_url.clone(),
            secrets.api_key("company_registry"),
        );
    if let Some(ref url) = config.adapters.rates_url {
        builder = builder.rates_base_url(url);
    }
    for entry in &config.providers {
        let provider = build_provider(entry, secrets.api_key(&entry.name), &client, timeout)?;
        builder = builder.provider(provider);
    }
    builder.build()
}

fn build_provider(
    entry: &ProviderConfig,
    api_key: Option<String>,
    client: &FetchClient,
    timeout: Duration,
) -> Result<Arc<dyn ChatProvider>> {
    let catalog = |base: &ModelCatalog| {
        let default = entry
            .default_model
            .clone()
            .unwrap_or_else(|| base.default_model.clone());
        ModelCatalog::new(default, base.models.iter().chain(&entry.models).cloned())
    };

    match entry.kind() {
        ProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(api_key, client.clone()).with_timeout(timeout);
            if let Some(ref url) = entry.base_url {
                provider = provider.with_base_url(url);
            }
            let merged = catalog(provider.catalog());
            Ok(Arc::new(provider.with_catalog(merged)))
        }
        ProviderKind::OpenaiCompat => {
            let mut provider = match OpenAiCompatProvider::preset(&entry.name, api_key.clone(), client.clone()) {
                Some(preset) => preset,
                None => {
                    let (Some(url), Some(model)) = (&entry.base_url, &entry.default_model) else {
                        return Err(HuginnError::Configuration(format!(
                            "provider '{}' is not a preset and needs base_url and default_model",
                            entry.name
                        )));
                    };
                    OpenAiCompatProvider::new(
                        &entry.name,
                        url,
                        api_key,
                        ModelCatalog::new(model, entry.models.iter().cloned()),
                        client.clone(),
                    )
                }
            };
            if let Some(ref url) = entry.base_url {
                provider = provider.with_base_url(url);
            }
            let merged = catalog(provider.catalog());
            Ok(Arc::new(provider.with_catalog(merged).with_timeout(timeout)))
        }
    }
}
