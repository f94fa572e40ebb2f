//! Huginn error types

use std::fmt;

/// One provider's failure inside an orchestrated call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    /// Provider name (e.g. `"openai"`).
    pub provider: String,
    /// Human-readable failure reason.
    pub reason: String,
    /// Whether the failure looks like bad caller input rather than an outage.
    pub client_error: bool,
    /// Whether the provider was actually called.
    pub attempted: bool,
}

impl ProviderFailure {
    /// Build a failure record from the error a provider returned.
    pub fn from_error(provider: impl Into<String>, err: &HuginnError) -> Self {
        Self {
            provider: provider.into(),
            reason: err.to_string(),
            client_error: err.is_client_error(),
            attempted: !matches!(err, HuginnError::CredentialsMissing),
        }
    }

    /// Record a provider that was never called.
    pub fn skipped(provider: impl Into<String>, err: &HuginnError) -> Self {
        Self {
            attempted: false,
            ..Self::from_error(provider, err)
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.reason)
    }
}

/// Join failures in chain order: `a: reason; b: reason`.
pub fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Upstream/network errors
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    // Caller errors
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    // Orchestration errors
    #[error("credentials not configured")]
    CredentialsMissing,

    #[error("model '{model}' not available from {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("all providers failed: {}", join_failures(.failures))]
    AllProvidersFailed { failures: Vec<ProviderFailure> },

    #[error("no provider configured")]
    NoProvider,

    // Local errors
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HuginnError {
    /// Whether the caller could have avoided this error by sending different input.
    ///
    /// Upstream 4xx responses count as client errors except for auth and
    /// rate limiting, which are our problem rather than the caller's.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::ModelNotAvailable { .. } => true,
            Self::Http { status, .. } => {
                (400..500).contains(status) && !matches!(*status, 401 | 403 | 429)
            }
            Self::AllProvidersFailed { failures } => {
                let attempted: Vec<_> = failures.iter().filter(|f| f.attempted).collect();
                !attempted.is_empty() && attempted.iter().all(|f| f.client_error)
            }
            _ => false,
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::DeadlineExceeded => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status the API surface should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Http { status: 404, .. } => 404,
            Self::ModelNotAvailable { .. } => 400,
            Self::Http { .. } | Self::AllProvidersFailed { .. } if self.is_client_error() => 400,
            _ => 500,
        }
    }

    /// Stable machine-readable error code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "upstream_unreachable",
            Self::Http { .. } => "upstream_error",
            Self::Decode(_) => "upstream_decode",
            Self::Validation(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::CredentialsMissing => "credentials_missing",
            Self::ModelNotAvailable { .. } => "model_not_available",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
            Self::NoProvider => "no_provider",
            Self::Storage(_) => "storage_error",
            Self::Configuration(_) => "configuration_error",
            Self::Json(_) => "json_error",
        }
    }
}

impl From<rusqlite::Error> for HuginnError {
    fn from(err: rusqlite::Error) -> Self {
        HuginnError::Storage(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
