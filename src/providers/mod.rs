//! Chat provider implementations and the fallback registry.

pub mod anthropic;
pub mod catalog;
pub mod openai_compat;
pub mod registry;
pub mod routing;
pub mod traits;

pub use anthropic::AnthropicProvider;
pub use catalog::ModelCatalog;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::ProviderRegistry;
pub use routing::RoutingConfig;
pub use traits::ChatProvider;
