//! Routing configuration for the fallback chain.
//!
//! # Preferred provider routing
//!
//! When `preferred` is set, the named provider is moved to position 0 in
//! the fallback chain. Other providers keep their registration order as
//! fallbacks.
//!
//! ```toml
//! [routing]
//! preferred = "anthropic"
//! deadline_secs = 2.5
//! ```
//!
//! # Overall deadline
//!
//! Without a deadline, total latency is bounded only by the per-call
//! timeout of each provider times the chain length. With one, each
//! attempt gets whatever budget remains and providers not reached in time
//! are reported as `deadline exceeded`. A zero or negative deadline means
//! no deadline.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoutingConfig {
    /// Provider tried first, regardless of registration order.
    #[serde(default)]
    pub preferred: Option<String>,
    /// Budget for a whole orchestrated call; `deadline_secs` in config,
    /// fractional seconds allowed.
    #[serde(
        default,
        rename = "deadline_secs",
        deserialize_with = "deserialize_deadline"
    )]
    pub deadline: Option<Duration>,
}

fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = Option::<f64>::deserialize(deserializer)?;
    Ok(secs
        .filter(|s| s.is_finite() && *s > 0.0)
        .and_then(|s| Duration::try_from_secs_f64(s).ok())
        .and_then(nonzero))
}

fn nonzero(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}

impl RoutingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preferred(mut self, provider: impl Into<String>) -> Self {
        self.preferred = Some(provider.into());
        self
    }

    /// Bound every orchestrated call. A zero duration clears the bound.
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = nonzero(deadline);
        self
    }

    pub fn deadline_duration(&self) -> Option<Duration> {
        self.deadline
    }
}

/// Reorder a provider slice so the named provider is at index 0.
///
/// If no provider matches `preferred`, the slice is left unchanged.
pub(crate) fn promote_preferred<T: HasName>(providers: &mut [T], preferred: &str) {
    if let Some(idx) = providers.iter().position(|p| p.name() == preferred)
        && idx > 0
    {
        // rotate, preserving relative order of the others
        providers[..=idx].rotate_right(1);
    }
}

/// Anything with a provider name, so `promote_preferred` works on
/// `Arc<dyn ChatProvider>` and on plain test fixtures alike.
pub(crate) trait HasName {
    fn name(&self) -> &str;
}
