//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.huginn/secrets.toml` (user, must be 0600)
//! 2. `/etc/huginn/secrets.toml` (system, must be 0600)
//!
//! Every secret falls back to a `<NAME>_API_KEY` environment variable.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::providers::RoutingConfig;
use crate::stats::StatsConfig;
use crate::{HuginnError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat providers in priority order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub stats: StatsSection,
    #[serde(default)]
    pub adapters: AdaptersConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
    /// Prefix every route is mounted under, e.g. `/api` (default: none).
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            base_path: String::new(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-call timeout for upstream requests in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub upstream_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            upstream_timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    OpenaiCompat,
    Anthropic,
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider name; also the secrets key. Built-in presets: `openai`,
    /// `groq`, `mistral`, `openrouter`, `anthropic`.
    pub name: String,
    #[serde(default)]
    pub kind: Option<ProviderKind>,
    /// Override the preset base URL (required for non-preset names).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Override the catalog default (required for non-preset names).
    #[serde(default)]
    pub default_model: Option<String>,
    /// Extra models accepted besides the default.
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        self.kind.unwrap_or(if self.name == "anthropic" {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenaiCompat
        })
    }
}

/// Where cached payloads live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default)]
    pub backend: CacheBackend,
    /// SQLite file for the `sqlite` backend (default: `~/.huginn/cache.db`).
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Capacity of the `memory` backend (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: None,
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsSection {
    /// SQLite file for statistics (default: `~/.huginn/stats.db`).
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
    /// Seconds between live-stream events.
    #[serde(default = "default_live_interval")]
    pub live_interval_secs: u64,
    /// Every n-th live event carries the full snapshot.
    #[serde(default = "default_live_full_every")]
    pub live_full_every: u64,
    /// Seconds before the live stream asks the client to reconnect.
    #[serde(default = "default_live_max")]
    pub live_max_secs: u64,
}

impl Default for StatsSection {
    fn default() -> Self {
        Self {
            path: None,
            snapshot_ttl_secs: default_snapshot_ttl(),
            retention_days: default_retention_days(),
            prune_interval_secs: default_prune_interval(),
            live_interval_secs: default_live_interval(),
            live_full_every: default_live_full_every(),
            live_max_secs: default_live_max(),
        }
    }
}

impl StatsSection {
    pub fn stats_config(&self) -> StatsConfig {
        StatsConfig::new()
            .snapshot_ttl(Duration::from_secs(self.snapshot_ttl_secs))
            .retention(Duration::from_secs(self.retention_days.saturating_mul(24 * 3600)))
    }
}

fn default_snapshot_ttl() -> u64 {
    60
}

fn default_retention_days() -> u64 {
    7
}

fn default_prune_interval() -> u64 {
    3600
}

fn default_live_interval() -> u64 {
    2
}

fn default_live_full_every() -> u64 {
    10
}

fn default_live_max() -> u64 {
    300
}

/// Upstream endpoints for the bundled adapters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub company_registry_url: Option<String>,
    #[serde(default)]
    pub rates_url: Option<String>,
}

/// Secrets: one table per name, each with an `api_key`.
///
/// ```toml
/// [openai]
/// api_key = "sk-..."
///
/// [company_registry]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secrets {
    entries: HashMap<String, ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(HuginnError::Configuration(
            "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                .to_string(),
        ))
    }

    /// Normalized base path: empty, or `/prefix` without a trailing slash.
    pub fn base_path(&self) -> String {
        let trimmed = self.server.base_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Default location for huginn's data files.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".huginn"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/huginn"))
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.huginn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/huginn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".huginn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/huginn/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file, enforcing permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(HuginnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Insert a key (tests and programmatic setups).
    pub fn insert(&mut self, name: impl Into<String>, api_key: impl Into<String>) {
        self.entries.insert(
            name.into(),
            ApiKeySecret {
                api_key: api_key.into(),
            },
        );
    }

    /// API key for `name`, falling back to the `<NAME>_API_KEY` environment variable.
    pub fn api_key(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(env_var_name(name)).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// `openrouter` → `OPENROUTER_API_KEY`, `company-registry` → `COMPANY_REGISTRY_API_KEY`.
pub fn env_var_name(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{upper}_API_KEY")
}
