//! Centralized telemetry name constants.
//!
//! Span names, metric names, and attribute keys are part of the public API:
//! dashboards and alerts key on them, so they live in one place and never
//! change casually.
//!
//! ## Naming convention
//! - Spans: `{component}.{operation}` (`router.route`, `eventbus.publish`)
//! - Metrics: `{component}_{noun}_{unit-or-total}` in Prometheus style
//! - Attributes: OpenTelemetry messaging conventions plus
//!   `cloudevents.*` for event identity

/// `messaging.system` value for router spans.
pub const ROUTER_SYSTEM: &str = "nimbusRouter";

/// `messaging.system` value for event-bus spans.
pub const EVENTBUS_SYSTEM: &str = "nimbusEventBus";

/// Span names.
pub mod spans {
    pub const ROUTER_ROUTE: &str = "router.route";
    pub const EVENTBUS_PUBLISH: &str = "eventbus.publish";
    pub const EVENTBUS_HANDLE: &str = "eventbus.handle";

    /// Span event added on each delivery retry.
    pub const RETRY_EVENT: &str = "retry";
}

/// Span attribute keys.
pub mod attrs {
    pub const MESSAGING_SYSTEM: &str = "messaging.system";
    pub const ROUTER_NAME: &str = "messaging.router_name";
    pub const EVENTBUS_NAME: &str = "messaging.eventbus_name";
    pub const OPERATION: &str = "messaging.operation";
    pub const DESTINATION: &str = "messaging.destination";
    pub const CORRELATION_ID: &str = "correlation_id";
    pub const EVENT_ID: &str = "cloudevents.event_id";
    pub const EVENT_SOURCE: &str = "cloudevents.event_source";

    /// Attributes of the `retry` span event.
    pub const RETRY_ATTEMPT: &str = "attempt";
    pub const RETRY_DELAY_MS: &str = "delay_ms";

    /// `messaging.operation` values.
    pub const OP_ROUTE: &str = "route";
    pub const OP_PUBLISH: &str = "publish";
    pub const OP_PROCESS: &str = "process";
}

/// Metric names.
pub mod metrics {
    pub const ROUTER_MESSAGES_ROUTED_TOTAL: &str = "router_messages_routed_total";
    pub const ROUTER_ROUTING_DURATION_SECONDS: &str = "router_routing_duration_seconds";
    pub const EVENTBUS_EVENTS_PUBLISHED_TOTAL: &str = "eventbus_events_published_total";
    pub const EVENTBUS_EVENTS_DELIVERED_TOTAL: &str = "eventbus_events_delivered_total";
    pub const EVENTBUS_RETRY_ATTEMPTS_TOTAL: &str = "eventbus_retry_attempts_total";
    pub const EVENTBUS_EVENT_HANDLING_DURATION_SECONDS: &str =
        "eventbus_event_handling_duration_seconds";
    pub const EVENTBUS_EVENT_SIZE_BYTES: &str = "eventbus_event_size_bytes";
}

/// Metric label names and values.
pub mod labels {
    pub const ROUTER_NAME: &str = "router_name";
    pub const MESSAGE_TYPE: &str = "message_type";
    pub const EVENTBUS_NAME: &str = "eventbus_name";
    pub const EVENT_TYPE: &str = "event_type";
    pub const STATUS: &str = "status";

    pub const STATUS_SUCCESS: &str = "success";
    pub const STATUS_ERROR: &str = "error";

    /// Label sets, in the order label values are supplied.
    pub const ROUTER_ROUTED: &[&str] = &[ROUTER_NAME, MESSAGE_TYPE, STATUS];
    pub const ROUTER_DURATION: &[&str] = &[ROUTER_NAME, MESSAGE_TYPE];
    pub const EVENTBUS_BASE: &[&str] = &[EVENTBUS_NAME, EVENT_TYPE];
    pub const EVENTBUS_DELIVERED: &[&str] = &[EVENTBUS_NAME, EVENT_TYPE, STATUS];
}
