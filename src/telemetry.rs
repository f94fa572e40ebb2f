//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! These metrics are process-local and complement the durable request
//! statistics kept by [`StatsRecorder`](crate::stats::StatsRecorder).
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — AI provider name (e.g. "openai", "anthropic")
//! - `status` — outcome: "ok" or "error"
//! - `namespace` — cache key namespace (e.g. "company", "stats")

/// Provider attempts made by the fallback orchestrator.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const PROVIDER_REQUESTS_TOTAL: &str = "huginn_provider_requests_total";

/// Duration of a single provider attempt in seconds.
///
/// Labels: `provider`.
pub const PROVIDER_DURATION_SECONDS: &str = "huginn_provider_duration_seconds";

/// Orchestrated calls answered by a provider other than the primary.
///
/// Labels: `primary`, `used`.
pub const FALLBACKS_TOTAL: &str = "huginn_fallbacks_total";

/// Total tokens consumed.
///
/// Labels: `provider`, `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "huginn_tokens_total";

/// Total cache hits.
///
/// Labels: `namespace`.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses (including degraded lookups).
///
/// Labels: `namespace`.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Cache store operations that failed and were degraded to a miss.
///
/// Labels: `store`.
pub const CACHE_ERRORS_TOTAL: &str = "huginn_cache_errors_total";

/// Request-statistics writes that failed and were dropped.
pub const STATS_WRITE_FAILURES_TOTAL: &str = "huginn_stats_write_failures_total";
