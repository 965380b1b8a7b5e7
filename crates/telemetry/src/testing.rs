//! Recording doubles for the tracer and meter capabilities.
//!
//! These capture everything in memory so tests can assert on span names,
//! kinds, attributes, retry events, and metric points without a collector.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::meter::{Counter, Histogram, Meter};
use crate::tracer::{AttrValue, Attribute, Span, SpanKind, Tracer};

/// A span event captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

/// A span captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub name: String,
    pub kind: SpanKind,
    pub attributes: Vec<Attribute>,
    pub events: Vec<RecordedEvent>,
    pub error: Option<String>,
    pub ended: bool,
}

impl RecordedSpan {
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key == key)
            .map(|attribute| &attribute.value)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        match self.attribute(key) {
            Some(AttrValue::Str(value)) => Some(value),
            _ => None,
        }
    }
}

/// Tracer double that keeps every span it ever started.
#[derive(Clone, Default)]
pub struct RecordingTracer {
    spans: Arc<Mutex<Vec<Arc<Mutex<RecordedSpan>>>>>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all spans, in start order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.spans.lock().iter().map(|span| span.lock().clone()).collect()
    }

    pub fn spans_named(&self, name: &str) -> Vec<RecordedSpan> {
        self.spans().into_iter().filter(|span| span.name == name).collect()
    }
}

impl Tracer for RecordingTracer {
    fn start_span(
        &self,
        name: &'static str,
        kind: SpanKind,
        attributes: Vec<Attribute>,
    ) -> Box<dyn Span> {
        let span = Arc::new(Mutex::new(RecordedSpan {
            name: name.to_string(),
            kind,
            attributes,
            events: Vec::new(),
            error: None,
            ended: false,
        }));
        self.spans.lock().push(span.clone());
        Box::new(RecordingSpan { span })
    }
}

struct RecordingSpan {
    span: Arc<Mutex<RecordedSpan>>,
}

impl Span for RecordingSpan {
    fn add_event(&mut self, name: &'static str, attributes: Vec<Attribute>) {
        self.span.lock().events.push(RecordedEvent {
            name: name.to_string(),
            attributes,
        });
    }

    fn record_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span.lock().events.push(RecordedEvent {
            name: "exception".to_string(),
            attributes: vec![crate::tracer::attr("exception.message", error.to_string())],
        });
    }

    fn set_error(&mut self, description: &str) {
        self.span.lock().error = Some(description.to_string());
    }

    fn end(&mut self) {
        self.span.lock().ended = true;
    }
}

/// One counter increment or histogram observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub name: String,
    pub label_values: Vec<String>,
    pub value: f64,
}

/// Meter double that appends every point to a shared list.
#[derive(Clone, Default)]
pub struct RecordingMeter {
    points: Arc<Mutex<Vec<MetricPoint>>>,
}

impl RecordingMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<MetricPoint> {
        self.points.lock().clone()
    }

    /// Sum of all points for a metric with exactly these label values.
    pub fn total(&self, name: &str, label_values: &[&str]) -> f64 {
        self.points
            .lock()
            .iter()
            .filter(|point| point.name == name && point.label_values == label_values)
            .map(|point| point.value)
            .sum()
    }

    /// Number of points recorded for a metric, across all label values.
    pub fn point_count(&self, name: &str) -> usize {
        self.points.lock().iter().filter(|point| point.name == name).count()
    }
}

impl Meter for RecordingMeter {
    fn counter(&self, name: &str, _: &str, _: &'static [&'static str]) -> Arc<dyn Counter> {
        Arc::new(RecordingInstrument {
            name: name.to_string(),
            points: self.points.clone(),
        })
    }

    fn histogram(
        &self,
        name: &str,
        _: &str,
        _: &[f64],
        _: &'static [&'static str],
    ) -> Arc<dyn Histogram> {
        Arc::new(RecordingInstrument {
            name: name.to_string(),
            points: self.points.clone(),
        })
    }
}

struct RecordingInstrument {
    name: String,
    points: Arc<Mutex<Vec<MetricPoint>>>,
}

impl RecordingInstrument {
    fn push(&self, value: f64, label_values: &[&str]) {
        self.points.lock().push(MetricPoint {
            name: self.name.clone(),
            label_values: label_values.iter().map(|v| v.to_string()).collect(),
            value,
        });
    }
}

impl Counter for RecordingInstrument {
    fn add(&self, value: u64, label_values: &[&str]) {
        self.push(value as f64, label_values);
    }
}

impl Histogram for RecordingInstrument {
    fn record(&self, value: f64, label_values: &[&str]) {
        self.push(value, label_values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::attr;

    #[test]
    fn test_recording_tracer_captures_lifecycle() {
        let tracer = RecordingTracer::new();
        let mut span = tracer.start_span("eventbus.handle", SpanKind::Consumer, vec![attr("k", "v")]);
        span.add_event("retry", vec![attr("attempt", 1i64)]);
        span.set_error("boom");
        span.end();

        let spans = tracer.spans_named("eventbus.handle");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, SpanKind::Consumer);
        assert_eq!(spans[0].attribute_str("k"), Some("v"));
        assert_eq!(spans[0].events[0].name, "retry");
        assert_eq!(spans[0].error.as_deref(), Some("boom"));
        assert!(spans[0].ended);
    }

    #[test]
    fn test_recording_meter_sums_points() {
        let meter = RecordingMeter::new();
        let counter = meter.counter("x_total", "", &[]);
        counter.add(1, &["a"]);
        counter.add(2, &["a"]);
        counter.add(5, &["b"]);

        assert_eq!(meter.total("x_total", &["a"]), 3.0);
        assert_eq!(meter.point_count("x_total"), 3);
    }
}
