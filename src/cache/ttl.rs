//! TTL classes keyed on data volatility.

use std::time::Duration;

/// How long a cached payload stays fresh.
///
/// Pick the class by how often the upstream data actually changes, not by
/// how expensive it is to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Near-real-time data (prices, live telemetry). 1 minute.
    Live,
    /// Fast-moving data (exchange rates, feeds). 15 minutes.
    Short,
    /// 1 hour.
    Hourly,
    /// Daily-changing data (forecasts, daily quotes). 24 hours.
    Daily,
    /// 7 days.
    Weekly,
    /// Near-immutable registry data. 30 days.
    Monthly,
    Custom(Duration),
}

impl Ttl {
    pub fn duration(self) -> Duration {
        match self {
            Self::Live => Duration::from_secs(60),
            Self::Short => Duration::from_secs(15 * 60),
            Self::Hourly => Duration::from_secs(3600),
            Self::Daily => Duration::from_secs(24 * 3600),
            Self::Weekly => Duration::from_secs(7 * 24 * 3600),
            Self::Monthly => Duration::from_secs(30 * 24 * 3600),
            Self::Custom(d) => d,
        }
    }
}

impl From<Ttl> for Duration {
    fn from(ttl: Ttl) -> Self {
        ttl.duration()
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Self::Custom(d)
    }
}
