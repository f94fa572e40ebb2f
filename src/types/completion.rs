//! Completion request/response types for orchestrated AI calls.

use serde::{Deserialize, Serialize};

/// A single orchestrated completion request.
///
/// Range checks on `temperature` and `max_tokens` belong to the caller;
/// providers surface their own rejections as failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Explicit model; when unset each provider uses its catalog default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CompletionRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Counts come from upstream responses; the total saturates.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// What a single provider returns for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// How an orchestrated call was routed.
///
/// `fallback_used` is true exactly when `used_provider != primary_provider`,
/// and `fallback_reason` is set exactly when `fallback_used` is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    pub primary_provider: String,
    pub used_provider: String,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
}

impl Routing {
    /// Routing record for a call answered by the primary provider.
    pub fn direct(provider: impl Into<String>) -> Self {
        let provider = provider.into();
        Self {
            primary_provider: provider.clone(),
            used_provider: provider,
            fallback_used: false,
            fallback_reason: None,
        }
    }

    /// Routing record for a call answered further down the chain.
    pub fn fallback(
        primary: impl Into<String>,
        used: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            primary_provider: primary.into(),
            used_provider: used.into(),
            fallback_used: true,
            fallback_reason: Some(reason.into()),
        }
    }
}

/// Result of an orchestrated AI call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider: String,
    pub model: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub duration_ms: u64,
    pub routing: Routing,
}
