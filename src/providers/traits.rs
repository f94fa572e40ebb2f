//! Provider trait for chat backends.
//!
//! A provider answers one completion per call. It does not retry and does
//! not fall back; both are the registry's business.
//!
//! # Availability
//!
//! - `is_configured() == false` means the provider has no credentials and
//!   must not be called. The registry records it as skipped.
//! - A model missing from `catalog()` is a local failure for this provider
//!   only; the registry moves on to the next one.

use std::sync::Arc;

use async_trait::async_trait;

use super::catalog::ModelCatalog;
use super::routing::HasName;
use crate::Result;
use crate::types::{Completion, CompletionRequest};

/// Provider for chat completions.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logging, routing and metrics labels.
    fn name(&self) -> &str;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Models this provider accepts, with its default.
    fn catalog(&self) -> &ModelCatalog;

    /// Run one completion against `model`, which is already resolved
    /// against this provider's catalog.
    async fn complete(&self, request: &CompletionRequest, model: &str) -> Result<Completion>;
}

impl HasName for Arc<dyn ChatProvider> {
    fn name(&self) -> &str {
        ChatProvider::name(self.as_ref())
    }
}
