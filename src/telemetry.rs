//! Telemetry metric name constants.
//!
//! Centralised metric names for headliner operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `headliner_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `mode`: delivery mode: "complete" or "stream"
//! - `status`: outcome: "ok" or "error"
//! - `direction`: token direction: "prompt" or "completion"

/// Total generation requests accepted by the service (after validation).
///
/// Labels: `mode`.
pub const GENERATIONS_TOTAL: &str = "headliner_generations_total";

/// Upstream completion call duration in seconds.
///
/// Labels: `mode`, `status`.
pub const PROVIDER_DURATION_SECONDS: &str = "headliner_provider_duration_seconds";

/// Total upstream completion failures.
///
/// Labels: `mode`.
pub const PROVIDER_ERRORS_TOTAL: &str = "headliner_provider_errors_total";

/// Total tokens reported by the provider for complete generations.
///
/// Labels: `direction`.
pub const TOKENS_TOTAL: &str = "headliner_tokens_total";

/// Total message cache hits.
pub const CACHE_HITS_TOTAL: &str = "headliner_cache_hits_total";

/// Total message cache misses (including expired entries).
pub const CACHE_MISSES_TOTAL: &str = "headliner_cache_misses_total";

/// Total fragments forwarded by the stream transport.
pub const STREAM_FRAGMENTS_TOTAL: &str = "headliner_stream_fragments_total";
