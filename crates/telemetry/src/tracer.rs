//! Span capability and its OpenTelemetry adapter.
//!
//! The router and event bus open spans through the [`Tracer`] trait only;
//! which SDK actually records them is decided by whoever constructs the
//! component. [`OtelTracer`] forwards to the global OpenTelemetry tracer,
//! [`NoopTracer`] drops everything.

use std::borrow::Cow;

use opentelemetry::global::{self, BoxedSpan, BoxedTracer};
use opentelemetry::trace::{
    Span as OtelSpanApi, SpanKind as OtelSpanKind, Status, Tracer as OtelTracerApi,
};
use opentelemetry::{Key, KeyValue};

/// Role of a span, mirroring the OpenTelemetry span kinds the core uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Internal,
    Producer,
    Consumer,
}

/// Attribute value; a deliberate subset of what providers support.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    I64(i64),
    F64(f64),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        Self::I64(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// One span attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: Cow<'static, str>,
    pub value: AttrValue,
}

/// Shorthand for building an [`Attribute`].
pub fn attr(key: impl Into<Cow<'static, str>>, value: impl Into<AttrValue>) -> Attribute {
    Attribute {
        key: key.into(),
        value: value.into(),
    }
}

/// A started span. Must be ended on every exit path; ending twice is a
/// no-op.
pub trait Span: Send {
    /// Attach a point-in-time event to the span.
    fn add_event(&mut self, name: &'static str, attributes: Vec<Attribute>);

    /// Record an exception on the span without changing its status.
    fn record_error(&mut self, error: &(dyn std::error::Error + 'static));

    /// Mark the span failed.
    fn set_error(&mut self, description: &str);

    fn end(&mut self);
}

/// Capability for opening spans.
pub trait Tracer: Send + Sync {
    fn start_span(
        &self,
        name: &'static str,
        kind: SpanKind,
        attributes: Vec<Attribute>,
    ) -> Box<dyn Span>;
}

/// Adapter over the global OpenTelemetry tracer.
pub struct OtelTracer {
    tracer: BoxedTracer,
}

impl OtelTracer {
    pub fn new(scope: &'static str) -> Self {
        Self {
            tracer: global::tracer(scope),
        }
    }
}

impl Tracer for OtelTracer {
    fn start_span(
        &self,
        name: &'static str,
        kind: SpanKind,
        attributes: Vec<Attribute>,
    ) -> Box<dyn Span> {
        let kind = match kind {
            SpanKind::Internal => OtelSpanKind::Internal,
            SpanKind::Producer => OtelSpanKind::Producer,
            SpanKind::Consumer => OtelSpanKind::Consumer,
        };
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .with_attributes(attributes.into_iter().map(to_key_value))
            .start(&self.tracer);
        Box::new(OtelSpanHandle { span })
    }
}

struct OtelSpanHandle {
    span: BoxedSpan,
}

impl Span for OtelSpanHandle {
    fn add_event(&mut self, name: &'static str, attributes: Vec<Attribute>) {
        self.span
            .add_event(name, attributes.into_iter().map(to_key_value).collect());
    }

    fn record_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span.record_error(error);
    }

    fn set_error(&mut self, description: &str) {
        self.span.set_status(Status::error(description.to_string()));
    }

    fn end(&mut self) {
        self.span.end();
    }
}

fn to_key_value(attribute: Attribute) -> KeyValue {
    let key = match attribute.key {
        Cow::Borrowed(s) => Key::from_static_str(s),
        Cow::Owned(s) => Key::new(s),
    };
    match attribute.value {
        AttrValue::Str(v) => KeyValue::new(key, v),
        AttrValue::I64(v) => KeyValue::new(key, v),
        AttrValue::F64(v) => KeyValue::new(key, v),
        AttrValue::Bool(v) => KeyValue::new(key, v),
    }
}

/// Tracer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_span(&self, _: &'static str, _: SpanKind, _: Vec<Attribute>) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

struct NoopSpan;

impl Span for NoopSpan {
    fn add_event(&mut self, _: &'static str, _: Vec<Attribute>) {}
    fn record_error(&mut self, _: &(dyn std::error::Error + 'static)) {}
    fn set_error(&mut self, _: &str) {}
    fn end(&mut self) {}
}
