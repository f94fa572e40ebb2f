//! Builder assembling every Huginn dependency explicitly.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{CompanyAdapter, RatesAdapter};
use crate::cache::{CacheConfig, CacheStore, MemoryCacheStore, ResponseCache};
use crate::http::FetchClient;
use crate::providers::{
    AnthropicProvider, ChatProvider, OpenAiCompatProvider, ProviderRegistry, RoutingConfig,
};
use crate::stats::{SqliteStatsStore, StatsConfig, StatsRecorder, StatsStore};
use crate::{HuginnError, Result};

use super::AiGateway;

/// Main entry point for creating a gateway instance.
///
/// ```rust,no_run
/// # fn main() -> huginn::Result<()> {
/// let huginn = huginn::Huginn::builder()
///     .openai_compat("groq", std::env::var("GROQ_API_KEY").ok())
///     .anthropic(std::env::var("ANTHROPIC_API_KEY").ok())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Huginn {
    pub ai: AiGateway,
    pub company: CompanyAdapter,
    pub rates: RatesAdapter,
    pub stats: StatsRecorder,
    pub cache: ResponseCache,
}

impl Huginn {
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

enum PendingProvider {
    Ready(Arc<dyn ChatProvider>),
    Preset(String, Option<String>),
    Anthropic(Option<String>),
}

/// Builder for [`Huginn`]. Unset stores default to in-process ones.
#[derive(Default)]
pub struct HuginnBuilder {
    client: Option<FetchClient>,
    cache_store: Option<Arc<dyn CacheStore>>,
    cache_config: CacheConfig,
    stats_store: Option<Arc<dyn StatsStore>>,
    stats_config: StatsConfig,
    providers: Vec<PendingProvider>,
    routing: RoutingConfig,
    timeout: Option<Duration>,
    company_base_url: Option<String>,
    company_api_key: Option<String>,
    rates_base_url: Option<String>,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared HTTP client for providers and adapters.
    pub fn fetch_client(mut self, client: FetchClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Capacity for the default in-memory cache store.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn stats_store(mut self, store: Arc<dyn StatsStore>) -> Self {
        self.stats_store = Some(store);
        self
    }

    pub fn stats_config(mut self, config: StatsConfig) -> Self {
        self.stats_config = config;
        self
    }

    /// Append a ready-made provider to the fallback chain.
    pub fn provider(mut self, provider: Arc<dyn ChatProvider>) -> Self {
        self.providers.push(PendingProvider::Ready(provider));
        self
    }

    /// Append a built-in OpenAI-compatible preset (`openai`, `groq`,
    /// `mistral`, `openrouter`). A missing key keeps the provider in the
    /// chain as unconfigured.
    pub fn openai_compat(mut self, preset: impl Into<String>, api_key: Option<String>) -> Self {
        self.providers
            .push(PendingProvider::Preset(preset.into(), api_key));
        self
    }

    pub fn anthropic(mut self, api_key: Option<String>) -> Self {
        self.providers.push(PendingProvider::Anthropic(api_key));
        self
    }

    pub fn routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    /// Per-call timeout for providers added through presets.
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn company_registry(mut self, base_url: Option<String>, api_key: Option<String>) -> Self {
        self.company_base_url = base_url;
        self.company_api_key = api_key;
        self
    }

    pub fn rates_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.rates_base_url = Some(base_url.into());
        self
    }

    pub fn build(self) -> Result<Huginn> {
        let client = match self.client {
            Some(c) => c,
            None => FetchClient::new()?,
        };
        let store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryCacheStore::new(&self.cache_config)));
        let cache = ResponseCache::new(store);

        let mut registry = ProviderRegistry::new();
        for pending in self.providers {
            let provider: Arc<dyn ChatProvider> = match pending {
                PendingProvider::Ready(p) => p,
                PendingProvider::Preset(name, key) => {
                    let mut provider = OpenAiCompatProvider::preset(&name, key, client.clone())
                        .ok_or_else(|| {
                            HuginnError::Configuration(format!("unknown provider preset '{name}'"))
                        })?;
                    if let Some(timeout) = self.timeout {
                        provider = provider.with_timeout(timeout);
                    }
                    Arc::new(provider)
                }
                PendingProvider::Anthropic(key) => {
                    let mut provider = AnthropicProvider::new(key, client.clone());
                    if let Some(timeout) = self.timeout {
                        provider = provider.with_timeout(timeout);
                    }
                    Arc::new(provider)
                }
            };
            registry.add_chat(provider);
        }
        registry.apply_routing(&self.routing);

        let stats_store: Arc<dyn StatsStore> = match self.stats_store {
            Some(s) => s,
            None => Arc::new(SqliteStatsStore::in_memory()?),
        };
        let stats = StatsRecorder::new(stats_store, cache.clone(), self.stats_config);

        let mut company = CompanyAdapter::new(client.clone(), cache.clone())
            .with_api_key(self.company_api_key);
        if let Some(url) = self.company_base_url {
            company = company.with_base_url(url);
        }
        let mut rates = RatesAdapter::new(client, cache.clone());
        if let Some(url) = self.rates_base_url {
            rates = rates.with_base_url(url);
        }

        Ok(Huginn {
            ai: AiGateway::new(Arc::new(registry)),
            company,
            rates,
            stats,
            cache,
        })
    }
}
