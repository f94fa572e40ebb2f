//! Provider adapters: thin wrappers around third-party services.
//!
//! Each adapter validates its parameters, derives a [`CacheKey`](crate::cache::CacheKey)
//! in its own namespace, and fetches through
//! [`ResponseCache::load_or_compute`](crate::cache::ResponseCache::load_or_compute)
//! with a TTL matching the volatility of the data.

pub mod company;
pub mod rates;

pub use company::{Company, CompanyAdapter};
pub use rates::{ExchangeRates, RatesAdapter};
