//! Observability for the Nimbus messaging core.
//!
//! The core never binds to a tracing/metrics SDK directly: it talks to the
//! narrow [`tracer::Tracer`] and [`meter::Meter`] capabilities, and the
//! adapters here plug OpenTelemetry and Prometheus in at the edge.
//!
//! - `tracer`: span capability + OpenTelemetry adapter
//! - `meter`: counter/histogram capability + Prometheus adapter
//! - `init`: process-wide subscriber and propagator setup
//! - `propagation`: W3C trace-context carriers
//! - `testing`: recording doubles for assertions

pub mod init;
pub mod meter;
pub mod propagation;
pub mod testing;
pub mod tracer;

pub use init::{init, TelemetryConfig};
pub use meter::{
    Counter, Histogram, Meter, NoopMeter, PrometheusMeter, LATENCY_BUCKETS_SECONDS,
    SIZE_BUCKETS_BYTES,
};
pub use tracer::{attr, AttrValue, Attribute, NoopTracer, OtelTracer, Span, SpanKind, Tracer};
