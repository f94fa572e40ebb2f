//! Deterministic cache keys.
//!
//! A key is `namespace:operation:<digest>`, where the digest is the first
//! 16 hex chars of a SHA-256 over the normalized parameters. Parameters are
//! trimmed, lowercased and sorted by name, so `("Q", " Helsinki ")` and
//! `("q", "helsinki")` land on the same entry.
//!
//! ```rust
//! # use huginn::cache::CacheKey;
//! let key = CacheKey::builder("company", "lookup")
//!     .param("id", "00000205")
//!     .build();
//! assert!(key.as_str().starts_with("company:lookup:"));
//! ```

use std::fmt;

use sha2::{Digest, Sha256};

const DIGEST_HEX_LEN: usize = 16;

/// An opaque, deterministic cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn builder(namespace: &str, operation: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            namespace: namespace.to_string(),
            operation: operation.to_string(),
            params: Vec::new(),
        }
    }

    /// A fixed key with no parameters (e.g. a singleton snapshot).
    pub fn fixed(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The owning namespace (the part before the first `:`).
    pub fn namespace(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builder returned by [`CacheKey::builder`].
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    namespace: String,
    operation: String,
    params: Vec<(String, String)>,
}

impl CacheKeyBuilder {
    pub fn param(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.params.push((
            name.trim().to_lowercase(),
            value.to_string().trim().to_lowercase(),
        ));
        self
    }

    /// Add a parameter only when present.
    pub fn param_opt(self, name: &str, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn build(mut self) -> CacheKey {
        self.params.sort();

        let mut hasher = Sha256::new();
        for (name, value) in &self.params {
            hasher.update(name.as_bytes());
            hasher.update([0x1f_u8]);
            hasher.update(value.as_bytes());
            hasher.update([0x1e_u8]);
        }
        let digest = hasher.finalize();
        let hex: String = digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()
            .chars()
            .take(DIGEST_HEX_LEN)
            .collect();

        CacheKey(format!("{}:{}:{hex}", self.namespace, self.operation))
    }
}
