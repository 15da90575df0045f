//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

mod common;

use common::{REPLY_USAGE, Script, ScriptedProvider, headline_reply};
use headliner::{AttributeRecord, Headliner, telemetry};
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn record() -> AttributeRecord {
    AttributeRecord::new().source("google")
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn miss_then_hit_records_cache_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let service = Headliner::builder()
                    .provider(headline_reply())
                    .build()
                    .unwrap();
                service.generate(&record()).await.unwrap();
                service.generate(&record()).await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::GENERATIONS_TOTAL), 2);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert!(
        has_histogram(&snapshot, telemetry::PROVIDER_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

/// Sum a counter's values for one label value.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn completion_usage_records_token_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let service = Headliner::builder()
                    .provider(headline_reply())
                    .build()
                    .unwrap();
                service.generate(&record()).await.unwrap();
                // a cache hit reports no tokens
                service.generate(&record()).await.unwrap();
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "prompt"),
        u64::from(REPLY_USAGE.prompt_tokens)
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::TOKENS_TOTAL, "direction", "completion"),
        u64::from(REPLY_USAGE.completion_tokens)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_generation_records_error_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let service = Headliner::builder()
                    .provider(ScriptedProvider::new(Script::Fail))
                    .build()
                    .unwrap();
                let _ = service.generate(&record()).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(counter_total(&snapshot, telemetry::PROVIDER_ERRORS_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn invalid_input_records_nothing() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let service = Headliner::builder()
                    .provider(headline_reply())
                    .build()
                    .unwrap();
                let _ = service.generate(&AttributeRecord::new()).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::GENERATIONS_TOTAL), 0);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 0);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let service = Headliner::builder()
        .provider(headline_reply())
        .build()
        .unwrap();
    service.generate(&record()).await.unwrap();
}
