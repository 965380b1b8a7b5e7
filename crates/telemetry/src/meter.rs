//! Metric capability and its Prometheus adapter.
//!
//! Handles are created once per process per metric name and reused: the
//! Prometheus adapter caches vectors by name, so two components asking for
//! the same metric share one instrument and one registration.

use parking_lot::Mutex;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

/// Buckets for operation-latency histograms, in seconds.
pub const LATENCY_BUCKETS_SECONDS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Buckets for payload-size histograms, in bytes.
pub const SIZE_BUCKETS_BYTES: &[f64] = &[
    256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0,
];

/// Monotonic counter with labels supplied at record time.
pub trait Counter: Send + Sync {
    fn add(&self, value: u64, label_values: &[&str]);
}

/// Distribution with labels supplied at record time.
pub trait Histogram: Send + Sync {
    fn record(&self, value: f64, label_values: &[&str]);
}

/// Capability for obtaining metric handles.
///
/// `labels` fixes the label names; every `add`/`record` call supplies the
/// label values in the same order.
pub trait Meter: Send + Sync {
    fn counter(&self, name: &str, help: &str, labels: &'static [&'static str]) -> Arc<dyn Counter>;

    fn histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
        labels: &'static [&'static str],
    ) -> Arc<dyn Histogram>;
}

/// Prometheus-backed meter.
pub struct PrometheusMeter {
    registry: Registry,
    counters: Mutex<HashMap<String, Arc<PrometheusCounter>>>,
    histograms: Mutex<HashMap<String, Arc<PrometheusHistogram>>>,
}

impl PrometheusMeter {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Share an existing registry, e.g. the one already exposed on a
    /// metrics endpoint.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all gathered metrics in the Prometheus text format.
    pub fn export(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            error!(error = %err, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

impl Default for PrometheusMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter for PrometheusMeter {
    fn counter(&self, name: &str, help: &str, labels: &'static [&'static str]) -> Arc<dyn Counter> {
        let mut counters = self.counters.lock();
        if let Some(existing) = counters.get(name) {
            return existing.clone();
        }
        let vec = match IntCounterVec::new(Opts::new(name, help), labels) {
            Ok(vec) => vec,
            Err(err) => {
                error!(metric = name, error = %err, "failed to create counter");
                return Arc::new(NoopInstrument);
            }
        };
        if let Err(err) = self.registry.register(Box::new(vec.clone())) {
            error!(metric = name, error = %err, "failed to register counter");
        }
        let handle = Arc::new(PrometheusCounter { vec });
        counters.insert(name.to_string(), handle.clone());
        handle
    }

    fn histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
        labels: &'static [&'static str],
    ) -> Arc<dyn Histogram> {
        let mut histograms = self.histograms.lock();
        if let Some(existing) = histograms.get(name) {
            return existing.clone();
        }
        let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
        let vec = match HistogramVec::new(opts, labels) {
            Ok(vec) => vec,
            Err(err) => {
                error!(metric = name, error = %err, "failed to create histogram");
                return Arc::new(NoopInstrument);
            }
        };
        if let Err(err) = self.registry.register(Box::new(vec.clone())) {
            error!(metric = name, error = %err, "failed to register histogram");
        }
        let handle = Arc::new(PrometheusHistogram { vec });
        histograms.insert(name.to_string(), handle.clone());
        handle
    }
}

struct PrometheusCounter {
    vec: IntCounterVec,
}

impl Counter for PrometheusCounter {
    fn add(&self, value: u64, label_values: &[&str]) {
        self.vec.with_label_values(label_values).inc_by(value);
    }
}

struct PrometheusHistogram {
    vec: HistogramVec,
}

impl Histogram for PrometheusHistogram {
    fn record(&self, value: f64, label_values: &[&str]) {
        self.vec.with_label_values(label_values).observe(value);
    }
}

/// Meter that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMeter;

impl Meter for NoopMeter {
    fn counter(&self, _: &str, _: &str, _: &'static [&'static str]) -> Arc<dyn Counter> {
        Arc::new(NoopInstrument)
    }

    fn histogram(&self, _: &str, _: &str, _: &[f64], _: &'static [&'static str]) -> Arc<dyn Histogram> {
        Arc::new(NoopInstrument)
    }
}

struct NoopInstrument;

impl Counter for NoopInstrument {
    fn add(&self, _: u64, _: &[&str]) {}
}

impl Histogram for NoopInstrument {
    fn record(&self, _: f64, _: &[&str]) {}
}
