//! Provider registry with fallback chain semantics.
//!
//! The `ProviderRegistry` stores chat providers in priority order (index 0 =
//! highest, the *primary*). An orchestrated call walks the chain strictly in
//! order, one attempt per provider, never in parallel, and the first success
//! wins.
//!
//! # Fallback triggers
//!
//! Every failure falls through to the next provider:
//! - no credentials: skipped without an attempt (`credentials not configured`)
//! - requested model missing from the provider's catalog
//! - any error the provider returns (transport, HTTP status, decode)
//! - the optional overall deadline running out
//!
//! There are no retries inside a provider. When the chain is exhausted the
//! caller gets [`HuginnError::AllProvidersFailed`] listing every provider's
//! reason in chain order.
//!
//! # Fallback chain flow
//!
//! ```text
//! execute(request)
//!        │
//!        ▼
//!  ┌─────────────┐  no key        ┌─────────────┐  HTTP 429   ┌─────────────┐
//!  │  openai (0) │ ─────────────► │  groq (1)   │ ──────────► │ anthropic(2)│ ──► Ok
//!  └─────────────┘                └─────────────┘             └─────────────┘
//!
//!  routing = { primary: openai, used: anthropic, fallback_used: true,
//!              fallback_reason: "openai: credentials not configured;
//!                                groq: HTTP 429: slow down" }
//! ```
//!
//! # Pinned calls
//!
//! [`execute_on`](ProviderRegistry::execute_on) targets exactly one provider
//! with no fallback: it succeeds or fails outright with that provider's error.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{instrument, warn};

use super::routing::{RoutingConfig, promote_preferred};
use super::traits::ChatProvider;
use crate::error::{HuginnError, ProviderFailure, Result, join_failures};
use crate::telemetry;
use crate::types::{Completion, CompletionRequest, ProviderResult, Routing, Usage};

/// Registry of chat providers with fallback chain semantics.
#[derive(Default)]
pub struct ProviderRegistry {
    chat: Vec<Arc<dyn ChatProvider>>,
    deadline: Option<Duration>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chat provider (appended to end of chain).
    ///
    /// Call in priority order: first registered = primary.
    pub fn add_chat(&mut self, provider: Arc<dyn ChatProvider>) {
        self.chat.push(provider);
    }

    /// Bound a whole orchestrated call. `None` or zero disables the bound.
    pub fn set_deadline(&mut self, deadline: Option<Duration>) {
        self.deadline = deadline.filter(|d| !d.is_zero());
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Apply preferred-provider ordering and the deadline.
    pub fn apply_routing(&mut self, routing: &RoutingConfig) {
        if let Some(ref preferred) = routing.preferred {
            promote_preferred(&mut self.chat, preferred);
        }
        self.deadline = routing.deadline_duration();
    }

    /// Providers in chain order.
    pub fn providers(&self) -> &[Arc<dyn ChatProvider>] {
        &self.chat
    }

    /// Provider names in chain order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.chat.iter().map(|p| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.chat.is_empty()
    }

    /// Run `request` down the fallback chain.
    #[instrument(skip(self, request), fields(operation = "chat", chain = self.chat.len()))]
    pub async fn execute(&self, request: &CompletionRequest) -> Result<ProviderResult> {
        let Some(primary) = self.chat.first() else {
            return Err(HuginnError::NoProvider);
        };
        let primary = primary.name().to_string();
        let deadline_at = self.deadline.map(|d| Instant::now() + d);
        let mut failures: Vec<ProviderFailure> = Vec::new();

        for provider in &self.chat {
            let name = provider.name();

            if !provider.is_configured() {
                failures.push(ProviderFailure::from_error(
                    name,
                    &HuginnError::CredentialsMissing,
                ));
                continue;
            }

            let budget = match remaining(deadline_at) {
                Ok(budget) => budget,
                Err(e) => {
                    failures.push(ProviderFailure::skipped(name, &e));
                    continue;
                }
            };

            let model = match provider.catalog().resolve(name, request.model.as_deref()) {
                Ok(model) => model,
                Err(e) => {
                    warn!(provider = name, reason = %e, "provider cannot serve model");
                    failures.push(ProviderFailure::from_error(name, &e));
                    continue;
                }
            };

            let (result, elapsed) = Self::attempt(provider.as_ref(), request, model, budget).await;
            match result {
                Ok(completion) => {
                    let routing = if failures.is_empty() {
                        Routing::direct(name)
                    } else {
                        metrics::counter!(telemetry::FALLBACKS_TOTAL,
                            "primary" => primary.clone(),
                            "used" => name.to_owned(),
                        )
                        .increment(1);
                        Routing::fallback(&primary, name, join_failures(&failures))
                    };
                    return Ok(Self::finish(name, completion, elapsed, routing));
                }
                Err(e) => {
                    warn!(provider = name, reason = %e, "provider failed, falling back");
                    failures.push(ProviderFailure::from_error(name, &e));
                }
            }
        }

        Err(HuginnError::AllProvidersFailed { failures })
    }

    /// Run `request` on exactly one provider, with no fallback.
    #[instrument(skip(self, request), fields(operation = "chat"))]
    pub async fn execute_on(&self, provider: &str, request: &CompletionRequest) -> Result<ProviderResult> {
        let target = self
            .chat
            .iter()
            .find(|p| p.name() == provider)
            .ok_or_else(|| HuginnError::Validation(format!("unknown provider '{provider}'")))?;

        if !target.is_configured() {
            return Err(HuginnError::CredentialsMissing);
        }
        let model = target.catalog().resolve(provider, request.model.as_deref())?;
        let budget = remaining(self.deadline.map(|d| Instant::now() + d))?;

        let (result, elapsed) = Self::attempt(target.as_ref(), request, model, budget).await;
        let completion = result?;
        Ok(Self::finish(provider, completion, elapsed, Routing::direct(provider)))
    }

    /// One attempt, bounded by `budget` when set. Records metrics.
    async fn attempt(
        provider: &dyn ChatProvider,
        request: &CompletionRequest,
        model: &str,
        budget: Option<Duration>,
    ) -> (Result<Completion>, Duration) {
        let start = Instant::now();
        let result = match budget {
            Some(budget) => tokio::time::timeout(budget, provider.complete(request, model))
                .await
                .unwrap_or(Err(HuginnError::DeadlineExceeded)),
            None => provider.complete(request, model).await,
        };
        let elapsed = start.elapsed();
        Self::record_request(provider.name(), elapsed, result.is_ok());
        (result, elapsed)
    }

    fn finish(
        provider: &str,
        completion: Completion,
        elapsed: Duration,
        routing: Routing,
    ) -> ProviderResult {
        if let Some(ref usage) = completion.usage {
            Self::record_token_usage(provider, usage);
        }
        ProviderResult {
            provider: provider.to_string(),
            model: completion.model,
            content: completion.content,
            usage: completion.usage,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            routing,
        }
    }

    /// Record request count and duration metrics for one attempt.
    fn record_request(provider: &str, elapsed: Duration, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::PROVIDER_REQUESTS_TOTAL,
            "provider" => provider.to_owned(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::PROVIDER_DURATION_SECONDS,
            "provider" => provider.to_owned(),
        )
        .record(elapsed.as_secs_f64());
    }

    fn record_token_usage(provider: &str, usage: &Usage) {
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.to_owned(),
            "direction" => "prompt",
        )
        .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.to_owned(),
            "direction" => "completion",
        )
        .increment(u64::from(usage.completion_tokens));
    }
}

/// Budget left before `deadline_at`; `Ok(None)` when unbounded.
fn remaining(deadline_at: Option<Instant>) -> Result<Option<Duration>> {
    match deadline_at {
        None => Ok(None),
        Some(at) => {
            let now = Instant::now();
            if now >= at {
                Err(HuginnError::DeadlineExceeded)
            } else {
                Ok(Some(at - now))
            }
        }
    }
}
