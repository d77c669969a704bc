//! Property-Based Tests - Metric and Statistics Invariants
//!
//! Uses `proptest` to verify that histogram buckets, decision counters,
//! and resource normalization hold their invariants across random inputs.

use std::time::Duration;

use proptest::prelude::*;

use ranger_monitor::adapters::metrics::{MetricsRegistry, MonitorMetrics};
use ranger_monitor::domain::access::{AccessDecision, ResourceTuple};
use ranger_monitor::domain::outcome::ApiCallOutcome;
use ranger_monitor::domain::probe_stats::ProbeStats;

// ── Histogram Properties ────────────────────────────────────

proptest! {
    /// Bucket counts are cumulative and bounded by the sample count.
    #[test]
    fn histogram_buckets_are_cumulative(
        samples in prop::collection::vec(0.0f64..20_000.0, 0..200),
    ) {
        let registry = MetricsRegistry::new();
        let histogram = registry
            .histogram("prop_latency_ms", "latency", &[10.0, 100.0, 1000.0, 5000.0], &[])
            .unwrap();

        histogram.touch(&[]);
        for s in &samples {
            histogram.observe(*s, &[]);
        }

        let buckets = histogram.cumulative_buckets(&[]);
        prop_assert_eq!(buckets.len(), 4);
        for pair in buckets.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1, "buckets not cumulative: {buckets:?}");
        }
        for (bound, count) in &buckets {
            let expected = samples.iter().filter(|s| **s <= *bound).count() as u64;
            prop_assert_eq!(*count, expected);
        }
        prop_assert_eq!(histogram.sample_count(&[]), samples.len() as u64);
    }
}

// ── Decision Counter Properties ─────────────────────────────

fn outcome() -> impl Strategy<Value = Option<bool>> {
    // Some(allowed) for a decided check, None for an error.
    prop_oneof![Just(Some(true)), Just(Some(false)), Just(None)]
}

proptest! {
    /// total == allowed + denied, errors counted apart, min <= avg <= max.
    #[test]
    fn decided_checks_add_up(
        runs in prop::collection::vec((outcome(), 0u64..5_000), 0..100),
    ) {
        let metrics = MonitorMetrics::new(&MetricsRegistry::new()).unwrap();
        let stats = ProbeStats::new();

        for (result, ms) in &runs {
            let elapsed = Duration::from_millis(*ms);
            match result {
                Some(allowed) => {
                    let decision = AccessDecision::from_allowed(*allowed);
                    metrics.record_access_decision(decision, elapsed);
                    stats.record_decision(decision, elapsed);
                }
                None => {
                    metrics.record_access_error();
                    stats.record_error();
                }
            }
        }

        let snap = stats.snapshot();
        let decided = runs.iter().filter(|(r, _)| r.is_some()).count() as u64;
        prop_assert_eq!(snap.total, snap.allowed + snap.denied);
        prop_assert_eq!(snap.total, decided);
        prop_assert_eq!(snap.errors, runs.len() as u64 - decided);
        prop_assert_eq!(metrics.access_checks_total.get(&[]), snap.total);
        prop_assert_eq!(
            metrics.access_checks_total.get(&[]),
            metrics.access_allowed_total.get(&[]) + metrics.access_denied_total.get(&[])
        );
        prop_assert_eq!(metrics.access_check_duration_ms.sample_count(&[]), decided);
        if decided > 0 {
            prop_assert!(snap.min_time_ms <= snap.average_time_ms);
            prop_assert!(snap.average_time_ms <= snap.max_time_ms);
        }
    }

    /// Every intercepted call lands in exactly one status series.
    #[test]
    fn api_calls_split_by_status(
        outcomes in prop::collection::vec(0u8..3, 0..100),
    ) {
        let metrics = MonitorMetrics::new(&MetricsRegistry::new()).unwrap();
        for o in &outcomes {
            let outcome = match o {
                0 => ApiCallOutcome::Success,
                1 => ApiCallOutcome::Failed,
                _ => ApiCallOutcome::AmbiguousEmpty,
            };
            metrics.record_api_call("getGroups", outcome, Duration::from_millis(1));
        }

        let ok = metrics.api_calls_total.get(&["getGroups", "success"]);
        let err = metrics.api_calls_total.get(&["getGroups", "error"]);
        prop_assert_eq!(ok + err, outcomes.len() as u64);
        prop_assert_eq!(metrics.api_errors_total.get(&["getGroups"]), err);
        prop_assert_eq!(
            metrics.api_duration_ms.sample_count(&["getGroups"]),
            outcomes.len() as u64
        );
    }
}

// ── Resource Normalization Properties ───────────────────────

proptest! {
    /// Normalizing an already-normalized resource is the identity.
    #[test]
    fn resource_normalization_is_idempotent(
        db in "[ ]{0,2}[A-Za-z][A-Za-z0-9_]{0,10}[ ]{0,2}",
        table in proptest::option::of("[A-Za-z0-9_ ]{0,8}"),
        column in proptest::option::of("[A-Za-z0-9_ ]{0,8}"),
    ) {
        let once = ResourceTuple::new(&db, table.as_deref(), column.as_deref()).unwrap();
        let twice = ResourceTuple::new(once.database(), once.table(), once.column()).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.database(), db.trim().to_lowercase());
    }
}
