//! Running probe statistics.
//!
//! Written by the probe loop only, read by status queries from any task.
//! Counters are plain atomics; min/max use `fetch_min`/`fetch_max` so a
//! concurrent reader never observes a torn or lost update.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::access::AccessDecision;

/// Result of a single probe cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProbeResult {
    Decided(AccessDecision),
    Error(String),
}

/// One execution of the periodic access check.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRun {
    pub started_at: DateTime<Utc>,
    pub result: ProbeResult,
    pub duration: Duration,
}

/// Aggregated view over all completed probe runs.
#[derive(Debug, Default)]
pub struct ProbeStats {
    total: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    errors: AtomicU64,
    total_time_ms: AtomicU64,
    /// `u64::MAX` until the first successful run.
    min_time_ms: AtomicU64,
    max_time_ms: AtomicU64,
    last_run: Mutex<Option<ProbeRun>>,
}

/// Point-in-time copy of `ProbeStats`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProbeStatsSnapshot {
    pub total: u64,
    pub allowed: u64,
    pub denied: u64,
    pub errors: u64,
    pub average_time_ms: u64,
    pub min_time_ms: u64,
    pub max_time_ms: u64,
    pub last_run: Option<ProbeRun>,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self {
            min_time_ms: AtomicU64::new(u64::MAX),
            ..Self::default()
        }
    }

    /// Record a decided check. Only decided checks count toward `total`.
    pub fn record_decision(&self, decision: AccessDecision, elapsed: Duration) {
        let ms = duration_ms(elapsed);
        match decision {
            AccessDecision::Allowed => self.allowed.fetch_add(1, Ordering::Relaxed),
            AccessDecision::Denied => self.denied.fetch_add(1, Ordering::Relaxed),
        };
        self.total.fetch_add(1, Ordering::Relaxed);
        self.total_time_ms.fetch_add(ms, Ordering::Relaxed);
        self.min_time_ms.fetch_min(ms, Ordering::Relaxed);
        self.max_time_ms.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_run(&self, run: ProbeRun) {
        if let Ok(mut last) = self.last_run.lock() {
            *last = Some(run);
        }
    }

    pub fn snapshot(&self) -> ProbeStatsSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let total_time_ms = self.total_time_ms.load(Ordering::Relaxed);
        let min = self.min_time_ms.load(Ordering::Relaxed);

        ProbeStatsSnapshot {
            total,
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            average_time_ms: if total > 0 { total_time_ms / total } else { 0 },
            min_time_ms: if min == u64::MAX { 0 } else { min },
            max_time_ms: self.max_time_ms.load(Ordering::Relaxed),
            last_run: self.last_run.lock().ok().and_then(|last| last.clone()),
        }
    }
}

/// Whole milliseconds, saturating.
pub fn duration_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_reports_zero_min() {
        let stats = ProbeStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.min_time_ms, 0);
        assert_eq!(snap.average_time_ms, 0);
        assert!(snap.last_run.is_none());
    }

    #[test]
    fn test_min_max_average() {
        let stats = ProbeStats::new();
        stats.record_decision(AccessDecision::Allowed, Duration::from_millis(30));
        stats.record_decision(AccessDecision::Denied, Duration::from_millis(10));
        stats.record_decision(AccessDecision::Allowed, Duration::from_millis(20));

        let snap = stats.snapshot();
        assert_eq!(snap.total, 3);
        assert_eq!(snap.allowed, 2);
        assert_eq!(snap.denied, 1);
        assert_eq!(snap.min_time_ms, 10);
        assert_eq!(snap.max_time_ms, 30);
        assert_eq!(snap.average_time_ms, 20);
    }

    #[test]
    fn test_errors_do_not_count_toward_total() {
        let stats = ProbeStats::new();
        stats.record_error();
        stats.record_decision(AccessDecision::Denied, Duration::from_millis(5));

        let snap = stats.snapshot();
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.total, 1);
    }

    #[test]
    fn test_duration_ms_truncates_and_saturates() {
        assert_eq!(duration_ms(Duration::from_micros(1_999)), 1);
        assert_eq!(duration_ms(Duration::from_secs(5)), 5_000);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let stats = std::sync::Arc::new(ProbeStats::new());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let stats = std::sync::Arc::clone(&stats);
                std::thread::spawn(move || {
                    for j in 0..100u64 {
                        stats.record_decision(
                            AccessDecision::from_allowed(j % 2 == 0),
                            Duration::from_millis(i * 100 + j),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.total, 800);
        assert_eq!(snap.allowed + snap.denied, snap.total);
        assert_eq!(snap.min_time_ms, 0);
        assert_eq!(snap.max_time_ms, 799);
    }
}
