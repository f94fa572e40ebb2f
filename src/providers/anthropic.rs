//! Anthropic Messages API backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::catalog::ModelCatalog;
use super::traits::ChatProvider;
use crate::error::{HuginnError, Result};
use crate::http::{DEFAULT_TIMEOUT, FetchClient, FetchOptions};
use crate::types::{Completion, CompletionRequest, Usage};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
/// The Messages API requires `max_tokens`; used when the caller sets none.
const DEFAULT_MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    base_url: String,
    api_key: Option<String>,
    catalog: ModelCatalog,
    client: FetchClient,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, client: FetchClient) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            catalog: ModelCatalog::new(
                "claude-3-5-haiku-latest",
                ["claude-sonnet-4-0", "claude-3-7-sonnet-latest"],
            ),
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a provider with a custom base URL (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    async fn complete(&self, request: &CompletionRequest, model: &str) -> Result<Completion> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(HuginnError::CredentialsMissing)?;

        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system.as_deref(),
            messages: [Message {
                role: "user",
                content: &request.message,
            }],
            temperature: request.temperature,
        };
        let url = format!("{}/v1/messages", self.base_url);
        let options = FetchOptions::new()
            .timeout(self.timeout)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION);

        let response: MessagesResponse = self.client.post_json(&url, &body, &options).await?;
        let content: String = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if content.is_empty() {
            return Err(HuginnError::Decode("response contained no text".into()));
        }

        Ok(Completion {
            content,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response
                .usage
                .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        })
    }
}
