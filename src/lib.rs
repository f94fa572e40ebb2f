//! Huginn - caching, provider fallback and request telemetry for a JSON API gateway
//!
//! The crate bundles three cooperating subsystems:
//!
//! - a response cache ([`cache`]) with TTL classes, deterministic keys and
//!   in-memory or SQLite storage;
//! - an AI gateway ([`gateway`], [`providers`]) that walks an ordered chain
//!   of chat providers and reports which one served each call;
//! - request statistics ([`stats`]) aggregated per endpoint and per hour.
//!
//! With the `server` feature (on by default) the [`server`] module exposes
//! all of it over HTTP, and the `huginnd` binary runs that server.
//!
//! # Example
//!
//! ```rust,no_run
//! use huginn::{AiOptions, Huginn};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let huginn = Huginn::builder()
//!         .openai_compat("groq", std::env::var("GROQ_API_KEY").ok())
//!         .anthropic(std::env::var("ANTHROPIC_API_KEY").ok())
//!         .build()?;
//!
//!     let reply = huginn
//!         .ai
//!         .chat("What is the capital of France?", None, &AiOptions::default())
//!         .await?;
//!     println!("{} (via {})", reply.content, reply.routing.used_provider);
//!
//!     let rates = huginn.rates.latest("eur").await?;
//!     println!("{:?}", rates.rates.get("USD"));
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cache;
pub mod db;
pub mod error;
pub mod gateway;
pub mod http;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod stats;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, ResponseCache, Ttl};
pub use error::{HuginnError, ProviderFailure, Result};
pub use gateway::{AiGateway, AiOptions, Huginn, HuginnBuilder, Sentiment, SentimentResult};
pub use http::{FetchClient, FetchOptions};
pub use providers::{ChatProvider, ModelCatalog, ProviderRegistry, RoutingConfig};
pub use stats::{StatsConfig, StatsRecorder, StatsSnapshot};

pub use types::{
    Completion, CompletionRequest, Confirmation, Envelope, ErrorEnvelope, ProviderResult, Routing,
    Usage,
};

/// Crate version, shown by `huginnd --version`.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
