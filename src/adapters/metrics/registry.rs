//! Prometheus Metrics Registry - Idempotent Instrument Factory
//!
//! Wraps a `prometheus::Registry` with name-keyed lookup so that asking
//! twice for the same instrument hands back the same handle, while
//! asking for a different shape under an existing name is refused.
//!
//! Instruments are always label-vectors underneath; an instrument with
//! no labels is simply a vector keyed by the empty label set. Readers
//! scan collected families, so reading never creates a series.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use prometheus::core::Collector;
use prometheus::proto::{Metric, MetricFamily};
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use tracing::{debug, warn};

use crate::error::MetricsError;

/// Instrument kind, part of a metric's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Everything that must match for a re-registration to be idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricShape {
    kind: MetricKind,
    label_names: Vec<String>,
    buckets: Vec<f64>,
}

impl MetricShape {
    fn new(kind: MetricKind, label_names: &[&str], buckets: &[f64]) -> Self {
        Self {
            kind,
            label_names: owned(label_names),
            buckets: buckets.to_vec(),
        }
    }
}

impl fmt::Display for MetricShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.kind, self.label_names)?;
        if self.kind == MetricKind::Histogram {
            write!(f, " buckets={:?}", self.buckets)?;
        }
        Ok(())
    }
}

/// Monotonic counter.
#[derive(Clone)]
pub struct Counter {
    name: String,
    label_names: Vec<String>,
    inner: IntCounterVec,
}

impl Counter {
    pub fn inc(&self, labels: &[&str]) {
        self.inc_by(1, labels);
    }

    pub fn inc_by(&self, v: u64, labels: &[&str]) {
        match self.inner.get_metric_with_label_values(labels) {
            Ok(c) => c.inc_by(v),
            Err(e) => warn!(metric = %self.name, error = %e, "Dropped counter update"),
        }
    }

    /// Materialize the series at zero; existing values are untouched.
    pub fn touch(&self, labels: &[&str]) {
        if let Err(e) = self.inner.get_metric_with_label_values(labels) {
            warn!(metric = %self.name, error = %e, "Cannot create counter series");
        }
    }

    /// Current value, 0 for an unseen label set.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get(&self, labels: &[&str]) -> u64 {
        // Integer counters are stored exactly in the f64 sample.
        find_series(&self.inner, &self.label_names, labels)
            .map_or(0, |m| m.get_counter().get_value() as u64)
    }
}

/// Up/down value, last write wins.
#[derive(Clone)]
pub struct Gauge {
    name: String,
    label_names: Vec<String>,
    inner: GaugeVec,
}

impl Gauge {
    pub fn set(&self, v: f64, labels: &[&str]) {
        match self.inner.get_metric_with_label_values(labels) {
            Ok(g) => g.set(v),
            Err(e) => warn!(metric = %self.name, error = %e, "Dropped gauge update"),
        }
    }

    pub fn inc(&self, labels: &[&str]) {
        match self.inner.get_metric_with_label_values(labels) {
            Ok(g) => g.inc(),
            Err(e) => warn!(metric = %self.name, error = %e, "Dropped gauge update"),
        }
    }

    pub fn dec(&self, labels: &[&str]) {
        match self.inner.get_metric_with_label_values(labels) {
            Ok(g) => g.dec(),
            Err(e) => warn!(metric = %self.name, error = %e, "Dropped gauge update"),
        }
    }

    pub fn touch(&self, labels: &[&str]) {
        if let Err(e) = self.inner.get_metric_with_label_values(labels) {
            warn!(metric = %self.name, error = %e, "Cannot create gauge series");
        }
    }

    pub fn get(&self, labels: &[&str]) -> f64 {
        find_series(&self.inner, &self.label_names, labels)
            .map_or(0.0, |m| m.get_gauge().get_value())
    }
}

/// Fixed-bucket distribution with running sum and count.
#[derive(Clone)]
pub struct Histogram {
    name: String,
    label_names: Vec<String>,
    inner: HistogramVec,
}

impl Histogram {
    pub fn observe(&self, v: f64, labels: &[&str]) {
        match self.inner.get_metric_with_label_values(labels) {
            Ok(h) => h.observe(v),
            Err(e) => warn!(metric = %self.name, error = %e, "Dropped histogram observation"),
        }
    }

    /// Materialize the series so it is exported before the first observation.
    pub fn touch(&self, labels: &[&str]) {
        if let Err(e) = self.inner.get_metric_with_label_values(labels) {
            warn!(metric = %self.name, error = %e, "Cannot create histogram series");
        }
    }

    pub fn sample_count(&self, labels: &[&str]) -> u64 {
        find_series(&self.inner, &self.label_names, labels)
            .map_or(0, |m| m.get_histogram().get_sample_count())
    }

    pub fn sample_sum(&self, labels: &[&str]) -> f64 {
        find_series(&self.inner, &self.label_names, labels)
            .map_or(0.0, |m| m.get_histogram().get_sample_sum())
    }

    /// Cumulative `(upper_bound, count)` pairs, `+Inf` excluded. Empty for
    /// an unseen label set.
    pub fn cumulative_buckets(&self, labels: &[&str]) -> Vec<(f64, u64)> {
        find_series(&self.inner, &self.label_names, labels).map_or_else(Vec::new, |m| {
            m.get_histogram()
                .get_bucket()
                .iter()
                .map(|b| (b.get_upper_bound(), b.get_cumulative_count()))
                .collect()
        })
    }
}

/// Look up the existing series for `labels` without creating it.
fn find_series(
    collector: &impl Collector,
    label_names: &[String],
    labels: &[&str],
) -> Option<Metric> {
    if label_names.len() != labels.len() {
        return None;
    }
    let families = collector.collect();
    families
        .iter()
        .flat_map(MetricFamily::get_metric)
        .find(|m| {
            let pairs = m.get_label();
            label_names.iter().zip(labels).all(|(name, value)| {
                pairs
                    .iter()
                    .any(|p| p.get_name() == name && p.get_value() == *value)
            })
        })
        .cloned()
}

fn owned(label_names: &[&str]) -> Vec<String> {
    label_names.iter().map(ToString::to_string).collect()
}

enum Registered {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

struct Entry {
    shape: MetricShape,
    instrument: Registered,
}

/// Name-keyed instrument registry backed by a Prometheus registry.
///
/// Entries are never removed. Lookups take a short mutex; instrument
/// updates never touch it.
pub struct MetricsRegistry {
    registry: Registry,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<Counter, MetricsError> {
        let shape = MetricShape::new(MetricKind::Counter, label_names, &[]);
        let entry = self.get_or_register(name, shape, || {
            let inner = IntCounterVec::new(Opts::new(name, help), label_names)?;
            Ok((
                Box::new(inner.clone()),
                Registered::Counter(Counter {
                    name: name.to_string(),
                    label_names: owned(label_names),
                    inner,
                }),
            ))
        })?;
        match entry {
            Registered::Counter(c) => Ok(c),
            _ => unreachable!("shape check guarantees kind"),
        }
    }

    pub fn gauge(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<Gauge, MetricsError> {
        let shape = MetricShape::new(MetricKind::Gauge, label_names, &[]);
        let entry = self.get_or_register(name, shape, || {
            let inner = GaugeVec::new(Opts::new(name, help), label_names)?;
            Ok((
                Box::new(inner.clone()),
                Registered::Gauge(Gauge {
                    name: name.to_string(),
                    label_names: owned(label_names),
                    inner,
                }),
            ))
        })?;
        match entry {
            Registered::Gauge(g) => Ok(g),
            _ => unreachable!("shape check guarantees kind"),
        }
    }

    pub fn histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
        label_names: &[&str],
    ) -> Result<Histogram, MetricsError> {
        let ascending = buckets.windows(2).all(|w| w[0] < w[1]);
        if buckets.is_empty() || !ascending || buckets.iter().any(|b| b.is_nan()) {
            return Err(MetricsError::InvalidBuckets { name: name.to_string() });
        }

        let shape = MetricShape::new(MetricKind::Histogram, label_names, buckets);
        let entry = self.get_or_register(name, shape, || {
            let inner = HistogramVec::new(
                HistogramOpts::new(name, help).buckets(buckets.to_vec()),
                label_names,
            )?;
            Ok((
                Box::new(inner.clone()),
                Registered::Histogram(Histogram {
                    name: name.to_string(),
                    label_names: owned(label_names),
                    inner,
                }),
            ))
        })?;
        match entry {
            Registered::Histogram(h) => Ok(h),
            _ => unreachable!("shape check guarantees kind"),
        }
    }

    /// Render every registered instrument in the text exposition format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Content-Type header value for `render()` output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    fn get_or_register<F>(
        &self,
        name: &str,
        shape: MetricShape,
        build: F,
    ) -> Result<Registered, MetricsError>
    where
        F: FnOnce() -> Result<(Box<dyn Collector>, Registered), MetricsError>,
    {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = entries.get(name) {
            if existing.shape != shape {
                return Err(MetricsError::ShapeConflict {
                    name: name.to_string(),
                    existing: existing.shape.to_string(),
                    requested: shape.to_string(),
                });
            }
            return Ok(existing.instrument.clone_handle());
        }

        let (collector, instrument) = build()?;
        self.registry.register(collector)?;
        let handle = instrument.clone_handle();
        entries.insert(name.to_string(), Entry { shape, instrument });
        debug!(metric = name, "Registered instrument");
        Ok(handle)
    }
}

impl Registered {
    fn clone_handle(&self) -> Self {
        match self {
            Self::Counter(c) => Self::Counter(c.clone()),
            Self::Gauge(g) => Self::Gauge(g.clone()),
            Self::Histogram(h) => Self::Histogram(h.clone()),
        }
    }
}
