//! OpenAI-compatible chat completions backend.
//!
//! Covers every service speaking `POST {base}/chat/completions` with bearer
//! auth. Presets exist for OpenAI, Groq, Mistral and OpenRouter; anything
//! else can be configured with [`OpenAiCompatProvider::new`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::catalog::ModelCatalog;
use super::traits::ChatProvider;
use crate::error::{HuginnError, Result};
use crate::http::{DEFAULT_TIMEOUT, FetchClient, FetchOptions};
use crate::types::{Completion, CompletionRequest, Usage};

/// Built-in OpenAI-compatible services: (name, base URL, default model, extra models).
const PRESETS: &[(&str, &str, &str, &[&str])] = &[
    (
        "openai",
        "https://api.openai.com/v1",
        "gpt-4o-mini",
        &["gpt-4o", "gpt-4.1-mini", "gpt-4.1"],
    ),
    (
        "groq",
        "https://api.groq.com/openai/v1",
        "llama-3.1-8b-instant",
        &["llama-3.3-70b-versatile"],
    ),
    (
        "mistral",
        "https://api.mistral.ai/v1",
        "mistral-small-latest",
        &["mistral-large-latest", "open-mistral-nemo"],
    ),
    (
        "openrouter",
        "https://openrouter.ai/api/v1",
        "openai/gpt-4o-mini",
        &["anthropic/claude-3.5-haiku", "meta-llama/llama-3.1-8b-instruct"],
    ),
];

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    catalog: ModelCatalog,
    client: FetchClient,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        catalog: ModelCatalog,
        client: FetchClient,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            catalog,
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A built-in preset by name (`openai`, `groq`, `mistral`, `openrouter`).
    pub fn preset(name: &str, api_key: Option<String>, client: FetchClient) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(n, ..)| *n == name)
            .map(|(n, base, default, extra)| {
                Self::new(
                    *n,
                    *base,
                    api_key,
                    ModelCatalog::new(*default, extra.iter().copied()),
                    client,
                )
            })
    }

    /// Names of the built-in presets.
    pub fn preset_names() -> impl Iterator<Item = &'static str> {
        PRESETS.iter().map(|(n, ..)| *n)
    }

    /// Point at a different base URL (self-hosted gateways, wiremock).
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
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

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.message,
        });

        let body = ChatRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let options = FetchOptions::new().timeout(self.timeout).bearer(api_key);

        let response: ChatResponse = self.client.post_json(&url, &body, &options).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| HuginnError::Decode("response contained no choices".into()))?;

        Ok(Completion {
            content,
            model: response.model.unwrap_or_else(|| model.to_string()),
            usage: response
                .usage
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FetchClient {
        FetchClient::with_client(reqwest::Client::new())
    }

    #[test]
    fn presets_resolve() {
        for name in OpenAiCompatProvider::preset_names() {
            let p = OpenAiCompatProvider::preset(name, Some("k".into()), client()).unwrap();
            assert_eq!(ChatProvider::name(&p), name);
            assert!(p.is_configured());
            assert!(p.catalog().contains(&p.catalog().default_model));
        }
        assert!(OpenAiCompatProvider::preset("nope", None, client()).is_none());
    }

    #[test]
    fn blank_key_is_unconfigured() {
        let p = OpenAiCompatProvider::preset("groq", Some("  ".into()), client()).unwrap();
        assert!(!p.is_configured());
    }
}
