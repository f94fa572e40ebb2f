//! Currency exchange rates (Frankfurter-compatible upstream).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, ResponseCache, Ttl};
use crate::error::{HuginnError, Result};
use crate::http::{FetchClient, FetchOptions};

const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    pub date: String,
    pub rates: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct WireRates {
    base: String,
    date: String,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

/// Normalize a currency code: exactly three ASCII letters, uppercased.
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(HuginnError::Validation(format!(
            "invalid currency code '{code}'"
        )))
    }
}

#[derive(Clone)]
pub struct RatesAdapter {
    client: FetchClient,
    cache: ResponseCache,
    base_url: String,
}

impl RatesAdapter {
    pub fn new(client: FetchClient, cache: ResponseCache) -> Self {
        Self {
            client,
            cache,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create an adapter with a custom base URL (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Latest rates against `base`.
    #[tracing::instrument(skip(self))]
    pub async fn latest(&self, base: &str) -> Result<ExchangeRates> {
        let base = normalize_currency(base)?;
        let key = CacheKey::builder("rates", "latest").param("base", &base).build();

        self.cache
            .load_or_compute(&key, Ttl::Short, || async {
                let url = format!("{}/latest", self.base_url);
                let options = FetchOptions::new().query("from", base.as_str());
                let wire: WireRates = self.client.get_json(&url, &options).await?;
                Ok(ExchangeRates {
                    base: wire.base,
                    date: wire.date,
                    rates: wire.rates,
                })
            })
            .await
    }
}
