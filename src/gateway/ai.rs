//! AI operations on top of the fallback registry.
//!
//! Each operation is a system prompt plus a user message handed to
//! [`ProviderRegistry`]. When the caller pins a provider, the call goes to
//! that provider alone with no fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HuginnError, Result};
use crate::providers::ProviderRegistry;
use crate::types::{CompletionRequest, ProviderResult};

/// Upper bound for `max_tokens` accepted at the API surface.
pub const MAX_TOKENS_BOUND: u32 = 4096;

/// Per-call knobs shared by every AI operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Pin one provider; disables fallback.
    #[serde(default)]
    pub provider: Option<String>,
    /// Model for the pinned provider.
    #[serde(default)]
    pub model: Option<String>,
}

impl AiOptions {
    /// Range checks done at the API surface before any provider is called.
    ///
    /// The registry itself does not enforce these.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(HuginnError::Validation(format!(
                "temperature must be between 0 and 2, got {t}"
            )));
        }
        if let Some(n) = self.max_tokens
            && !(1..=MAX_TOKENS_BOUND).contains(&n)
        {
            return Err(HuginnError::Validation(format!(
                "max_tokens must be between 1 and {MAX_TOKENS_BOUND}, got {n}"
            )));
        }
        if self.model.is_some() && self.provider.is_none() {
            return Err(HuginnError::Validation(
                "model requires an explicit provider".into(),
            ));
        }
        Ok(())
    }
}

/// Sentiment label parsed from a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    /// Confidence in `[0, 1]` when the model gave one.
    pub score: Option<f32>,
    #[serde(flatten)]
    pub result: ProviderResult,
}

const SUMMARIZE_PROMPT: &str =
    "Summarize the user's text concisely in its original language. Reply with the summary only.";
const SENTIMENT_PROMPT: &str = "Classify the sentiment of the user's text. Reply with exactly one \
     word: positive, negative or neutral, followed by a confidence score between 0 and 1.";

/// Orchestrated AI operations. Cheap to clone.
#[derive(Clone)]
pub struct AiGateway {
    registry: Arc<ProviderRegistry>,
}

impl AiGateway {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    async fn run(&self, mut request: CompletionRequest, options: &AiOptions) -> Result<ProviderResult> {
        if request.message.trim().is_empty() {
            return Err(HuginnError::Validation("message must not be empty".into()));
        }
        options.validate()?;
        request.temperature = options.temperature;
        request.max_tokens = options.max_tokens;
        request.model = options.model.clone();
        match options.provider.as_deref() {
            Some(provider) => self.registry.execute_on(provider, &request).await,
            None => self.registry.execute(&request).await,
        }
    }

    pub async fn chat(&self, message: &str, system: Option<&str>, options: &AiOptions) -> Result<ProviderResult> {
        let mut request = CompletionRequest::new(message);
        if let Some(system) = system {
            request = request.system(system);
        }
        self.run(request, options).await
    }

    pub async fn summarize(&self, text: &str, options: &AiOptions) -> Result<ProviderResult> {
        self.run(CompletionRequest::new(text).system(SUMMARIZE_PROMPT), options)
            .await
    }

    pub async fn translate(&self, text: &str, target: &str, options: &AiOptions) -> Result<ProviderResult> {
        let target = target.trim();
        if target.is_empty() {
            return Err(HuginnError::Validation("target language must not be empty".into()));
        }
        let system = format!(
            "Translate the user's text into {target}. Reply with the translation only."
        );
        self.run(CompletionRequest::new(text).system(system), options)
            .await
    }

    pub async fn sentiment(&self, text: &str, options: &AiOptions) -> Result<SentimentResult> {
        let result = self
            .run(CompletionRequest::new(text).system(SENTIMENT_PROMPT), options)
            .await?;
        let (sentiment, score) = parse_sentiment(&result.content);
        Ok(SentimentResult {
            sentiment,
            score,
            result,
        })
    }

    pub async fn code(&self, prompt: &str, language: Option<&str>, options: &AiOptions) -> Result<ProviderResult> {
        let system = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => format!(
                "You are a programming assistant. Answer with {lang} code only, \
                 with brief comments where needed."
            ),
            None => "You are a programming assistant. Answer with code only, \
                     with brief comments where needed."
                .to_string(),
        };
        self.run(CompletionRequest::new(prompt).system(system), options)
            .await
    }
}

/// Pull a label and an optional score out of free-form model output.
///
/// Output without a recognizable label reads as neutral.
pub fn parse_sentiment(content: &str) -> (Sentiment, Option<f32>) {
    let lower = content.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '.'))
        .filter(|w| !w.is_empty())
        .collect();

    let sentiment = words
        .iter()
        .find_map(|w| match w.trim_end_matches('.') {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        })
        .unwrap_or(Sentiment::Neutral);

    let score = words
        .iter()
        .filter_map(|w| w.trim_end_matches('.').parse::<f32>().ok())
        .find(|s| (0.0..=1.0).contains(s));

    (sentiment, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parsing() {
        assert_eq!(parse_sentiment("Positive 0.92"), (Sentiment::Positive, Some(0.92)));
        assert_eq!(parse_sentiment("negative."), (Sentiment::Negative, None));
        assert_eq!(
            parse_sentiment("Sentiment: NEUTRAL (score: 0.5)"),
            (Sentiment::Neutral, Some(0.5))
        );
        assert_eq!(parse_sentiment("I cannot tell"), (Sentiment::Neutral, None));
        assert_eq!(parse_sentiment("positive, 7"), (Sentiment::Positive, None));
    }

    #[test]
    fn options_validation() {
        assert!(AiOptions::default().validate().is_ok());
        let bad_temp = AiOptions {
            temperature: Some(2.5),
            ..Default::default()
        };
        assert!(matches!(bad_temp.validate(), Err(HuginnError::Validation(_))));
        let bad_tokens = AiOptions {
            max_tokens: Some(0),
            ..Default::default()
        };
        assert!(bad_tokens.validate().is_err());
        let over = AiOptions {
            max_tokens: Some(MAX_TOKENS_BOUND + 1),
            ..Default::default()
        };
        assert!(over.validate().is_err());
        let model_only = AiOptions {
            model: Some("gpt-4o".into()),
            ..Default::default()
        };
        assert!(model_only.validate().is_err());
        let pinned = AiOptions {
            provider: Some("openai".into()),
            model: Some("gpt-4o".into()),
            temperature: Some(0.0),
            max_tokens: Some(MAX_TOKENS_BOUND),
        };
        assert!(pinned.validate().is_ok());
    }
}
