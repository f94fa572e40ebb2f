//! Outbound HTTP fetch client.
//!
//! [`FetchClient`] is the one place that talks to upstream services. It
//! classifies every failure into the crate taxonomy:
//!
//! - connection, DNS, TLS and timeout failures → [`HuginnError::Transport`]
//! - a response status ≥ 400 → [`HuginnError::Http`] carrying the status
//! - a body that does not decode as the expected JSON → [`HuginnError::Decode`]
//!
//! Redirects are followed up to [`MAX_REDIRECTS`] hops and TLS certificates
//! are always verified.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{HuginnError, Result};

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream error bodies are cut to this many bytes in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Default user agent, e.g. `huginn/0.3.0`.
pub const DEFAULT_USER_AGENT: &str = concat!("huginn/", env!("CARGO_PKG_VERSION"));

/// Per-call options.
///
/// ```rust
/// # use huginn::http::FetchOptions;
/// # use std::time::Duration;
/// let opts = FetchOptions::new()
///     .timeout(Duration::from_secs(5))
///     .header("Accept", "application/json")
///     .query("base", "EUR");
/// ```
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
    pub query: Vec<(String, String)>,
    /// HTTP basic credentials: (username, password).
    pub basic_auth: Option<(String, Option<String>)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
            user_agent: None,
            query: Vec::new(),
            basic_auth: None,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Shorthand for an `Authorization: Bearer …` header.
    pub fn bearer(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(AUTHORIZATION.as_str(), value)
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some((username.into(), password));
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: reqwest::Client,
}

impl FetchClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| HuginnError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Wrap an existing reqwest client (custom proxies, test doubles).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// GET and return the raw body.
    pub async fn get(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let request = self.http.get(url);
        self.send(url, request, options).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, options: &FetchOptions) -> Result<T> {
        let body = self.get(url, options).await?;
        decode(url, &body)
    }

    /// POST a JSON body and return the raw response body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        options: &FetchOptions,
    ) -> Result<String> {
        let request = self.http.post(url).json(body);
        self.send(url, request, options).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
        options: &FetchOptions,
    ) -> Result<T> {
        let body = self.post(url, body, options).await?;
        decode(url, &body)
    }

    async fn send(
        &self,
        url: &str,
        mut request: reqwest::RequestBuilder,
        options: &FetchOptions,
    ) -> Result<String> {
        request = request.timeout(options.timeout);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some((user, pass)) = &options.basic_auth {
            request = request.basic_auth(user, pass.as_deref());
        }
        if let Some(ua) = &options.user_agent {
            request = request.header(USER_AGENT, ua.as_str());
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!(url, error = %e, "fetch failed");
            HuginnError::Transport(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(url, status = status.as_u16(), "fetched");

        let body = response
            .text()
            .await
            .map_err(|e| HuginnError::Transport(format!("reading body: {e}")))?;

        if status.as_u16() >= 400 {
            let message = if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("upstream error")
                    .to_string()
            } else {
                truncate(body.trim(), MAX_ERROR_BODY).to_string()
            };
            return Err(HuginnError::Http {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!(url, error = %e, "response did not decode");
        HuginnError::Decode(e.to_string())
    })
}

/// Cut `s` to at most `max` bytes on a char boundary.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
