//! Asynchronous in-process event bus.
//!
//! Publishing enforces the CloudEvents size cap, then schedules one
//! delivery task per subscription and returns; the publisher never waits
//! for subscribers and never sees their failures. Each delivery retries
//! the handler with capped exponential backoff and finally funnels the
//! wrapped error into the subscription's error sink, so one bad subscriber
//! cannot poison another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info};

use nimbus_domain::message::Message;
use nimbus_shared::error::NimbusError;
use nimbus_shared::telemetry_names::{attrs, labels, metrics, spans, EVENTBUS_SYSTEM};
use nimbus_telemetry::meter::{
    Counter, Histogram, Meter, LATENCY_BUCKETS_SECONDS, SIZE_BUCKETS_BYTES,
};
use nimbus_telemetry::tracer::{attr, Attribute, SpanKind, Tracer};

use crate::retry::RetryPolicy;

/// CloudEvents size cap enforced on the JSON-encoded event.
pub const MAX_EVENT_SIZE_BYTES: usize = 64 * 1024;

fn default_max_event_size() -> usize {
    MAX_EVENT_SIZE_BYTES
}

/// Configuration for one event-bus instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// UTF-8 byte cap on the serialized event.
    #[serde(default = "default_max_event_size")]
    pub max_event_size_bytes: usize,

    /// Log every published event at debug level.
    #[serde(default)]
    pub log_publish: bool,

    /// Retry policy for subscriptions that do not bring their own.
    #[serde(default)]
    pub default_retry: RetryPolicy,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_event_size_bytes: MAX_EVENT_SIZE_BYTES,
            log_publish: false,
            default_retry: RetryPolicy::default(),
        }
    }
}

/// Handles deliveries of one event type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Message) -> Result<(), NimbusError>;
}

/// Wrap an async closure as an [`EventHandler`].
pub fn event_handler_fn<F>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Message) -> BoxFuture<'static, Result<(), NimbusError>> + Send + Sync + 'static,
{
    Arc::new(FnEventHandler(f))
}

struct FnEventHandler<F>(F);

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(Message) -> BoxFuture<'static, Result<(), NimbusError>> + Send + Sync,
{
    async fn handle(&self, event: &Message) -> Result<(), NimbusError> {
        (self.0)(event.clone()).await
    }
}

/// Receives the wrapped error after a delivery exhausts its retries.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    async fn on_error(&self, error: &NimbusError, event: &Message);
}

/// Wrap a sync closure as an [`ErrorSink`].
pub fn error_sink_fn<F>(f: F) -> Arc<dyn ErrorSink>
where
    F: Fn(&NimbusError, &Message) + Send + Sync + 'static,
{
    Arc::new(FnErrorSink(f))
}

struct FnErrorSink<F>(F);

#[async_trait]
impl<F> ErrorSink for FnErrorSink<F>
where
    F: Fn(&NimbusError, &Message) + Send + Sync,
{
    async fn on_error(&self, error: &NimbusError, event: &Message) {
        (self.0)(error, event)
    }
}

/// One subscription: event type, handler, optional error sink, optional
/// retry override.
pub struct Subscription {
    event_type: String,
    handler: Arc<dyn EventHandler>,
    on_error: Option<Arc<dyn ErrorSink>>,
    retry: Option<RetryPolicy>,
}

impl Subscription {
    pub fn new(event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            event_type: event_type.into(),
            handler,
            on_error: None,
            retry: None,
        }
    }

    pub fn with_on_error(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.on_error = Some(sink);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

#[derive(Clone)]
struct EventBusMetrics {
    published_total: Arc<dyn Counter>,
    delivered_total: Arc<dyn Counter>,
    retry_attempts_total: Arc<dyn Counter>,
    handling_duration: Arc<dyn Histogram>,
    event_size: Arc<dyn Histogram>,
}

impl EventBusMetrics {
    fn new(meter: &dyn Meter) -> Self {
        Self {
            published_total: meter.counter(
                metrics::EVENTBUS_EVENTS_PUBLISHED_TOTAL,
                "Events published",
                labels::EVENTBUS_BASE,
            ),
            delivered_total: meter.counter(
                metrics::EVENTBUS_EVENTS_DELIVERED_TOTAL,
                "Deliveries completed, by outcome",
                labels::EVENTBUS_DELIVERED,
            ),
            retry_attempts_total: meter.counter(
                metrics::EVENTBUS_RETRY_ATTEMPTS_TOTAL,
                "Delivery retries scheduled",
                labels::EVENTBUS_BASE,
            ),
            handling_duration: meter.histogram(
                metrics::EVENTBUS_EVENT_HANDLING_DURATION_SECONDS,
                "Event handling duration in seconds",
                LATENCY_BUCKETS_SECONDS,
                labels::EVENTBUS_BASE,
            ),
            event_size: meter.histogram(
                metrics::EVENTBUS_EVENT_SIZE_BYTES,
                "Serialized event size in bytes",
                SIZE_BUCKETS_BYTES,
                labels::EVENTBUS_BASE,
            ),
        }
    }
}

/// Named publish/subscribe event bus.
pub struct EventBus {
    name: String,
    config: EventBusConfig,
    subscriptions: RwLock<HashMap<String, Vec<Arc<Subscription>>>>,
    tracer: Arc<dyn Tracer>,
    metrics: EventBusMetrics,
    shutdown_tx: watch::Sender<bool>,
}

impl EventBus {
    pub fn new(
        name: impl Into<String>,
        config: EventBusConfig,
        tracer: Arc<dyn Tracer>,
        meter: &dyn Meter,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            config,
            subscriptions: RwLock::new(HashMap::new()),
            tracer,
            metrics: EventBusMetrics::new(meter),
            shutdown_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a subscription. Many subscriptions per type are allowed and
    /// there is no unsubscribe.
    pub fn subscribe_event(&self, subscription: Subscription) {
        info!(
            eventbus = %self.name,
            event_type = %subscription.event_type,
            "registered event subscription"
        );
        self.subscriptions
            .write()
            .entry(subscription.event_type.clone())
            .or_default()
            .push(Arc::new(subscription));
    }

    pub fn subscription_count(&self, event_type: &str) -> usize {
        self.subscriptions
            .read()
            .get(event_type)
            .map_or(0, |subs| subs.len())
    }

    /// Publish one event.
    ///
    /// Returns once every subscriber task is scheduled; subscriber errors
    /// never reach the publisher. The only publisher-visible failure is
    /// the size cap.
    pub async fn put_event(&self, event: &Message) -> Result<(), NimbusError> {
        let payload = serde_json::to_vec(event).map_err(NimbusError::generic_from)?;
        let size_bytes = payload.len();
        if size_bytes > self.config.max_event_size_bytes {
            return Err(
                NimbusError::generic("Event size exceeds the limit of 64KB").with_details(json!({
                    "eventType": event.message_type,
                    "eventSource": event.source,
                    "eventSizeBytes": size_bytes,
                    "maxSizeBytes": self.config.max_event_size_bytes,
                })),
            );
        }

        let mut span = self.tracer.start_span(
            spans::EVENTBUS_PUBLISH,
            SpanKind::Producer,
            self.event_attrs(event, attrs::OP_PUBLISH),
        );

        let bus_labels = [self.name.as_str(), event.message_type.as_str()];
        self.metrics.published_total.add(1, &bus_labels);
        self.metrics.event_size.record(size_bytes as f64, &bus_labels);

        if self.config.log_publish {
            debug!(
                eventbus = %self.name,
                event_type = %event.message_type,
                event_id = %event.id,
                size_bytes,
                "publishing event"
            );
        }

        let subscriptions = self
            .subscriptions
            .read()
            .get(&event.message_type)
            .cloned()
            .unwrap_or_default();
        for subscription in subscriptions {
            let policy = subscription
                .retry
                .clone()
                .unwrap_or_else(|| self.config.default_retry.clone());
            let task = DeliveryTask {
                bus_name: self.name.clone(),
                event: event.clone(),
                subscription,
                policy,
                tracer: self.tracer.clone(),
                metrics: self.metrics.clone(),
                shutdown: self.shutdown_tx.subscribe(),
            };
            tokio::spawn(task.run());
        }

        span.end();
        Ok(())
    }

    /// Publish a batch; stops at the first size violation.
    pub async fn put_events(&self, events: &[Message]) -> Result<(), NimbusError> {
        for event in events {
            self.put_event(event).await?;
        }
        Ok(())
    }

    /// Abort pending retry sleeps; in-flight deliveries are abandoned.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn event_attrs(&self, event: &Message, operation: &'static str) -> Vec<Attribute> {
        let mut span_attrs = vec![
            attr(attrs::MESSAGING_SYSTEM, EVENTBUS_SYSTEM),
            attr(attrs::EVENTBUS_NAME, self.name.clone()),
            attr(attrs::OPERATION, operation),
            attr(attrs::DESTINATION, event.message_type.clone()),
            attr(attrs::EVENT_ID, event.id.clone()),
            attr(attrs::EVENT_SOURCE, event.source.clone()),
        ];
        if let Some(correlation_id) = &event.correlation_id {
            span_attrs.push(attr(attrs::CORRELATION_ID, correlation_id.clone()));
        }
        span_attrs
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// One delivery of one event to one subscription.
struct DeliveryTask {
    bus_name: String,
    event: Message,
    subscription: Arc<Subscription>,
    policy: RetryPolicy,
    tracer: Arc<dyn Tracer>,
    metrics: EventBusMetrics,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryTask {
    async fn run(mut self) {
        let started = Instant::now();
        let mut span_attrs = vec![
            attr(attrs::MESSAGING_SYSTEM, EVENTBUS_SYSTEM),
            attr(attrs::EVENTBUS_NAME, self.bus_name.clone()),
            attr(attrs::OPERATION, attrs::OP_PROCESS),
            attr(attrs::DESTINATION, self.event.message_type.clone()),
            attr(attrs::EVENT_ID, self.event.id.clone()),
            attr(attrs::EVENT_SOURCE, self.event.source.clone()),
        ];
        if let Some(correlation_id) = &self.event.correlation_id {
            span_attrs.push(attr(attrs::CORRELATION_ID, correlation_id.clone()));
        }
        let mut span =
            self.tracer
                .start_span(spans::EVENTBUS_HANDLE, SpanKind::Consumer, span_attrs);

        let bus_labels = [self.bus_name.as_str(), self.event.message_type.as_str()];
        let mut attempt: u32 = 0;
        let failure = loop {
            match self.subscription.handler.handle(&self.event).await {
                Ok(()) => {
                    self.metrics.delivered_total.add(
                        1,
                        &[
                            self.bus_name.as_str(),
                            self.event.message_type.as_str(),
                            labels::STATUS_SUCCESS,
                        ],
                    );
                    self.metrics
                        .handling_duration
                        .record(started.elapsed().as_secs_f64(), &bus_labels);
                    span.end();
                    return;
                }
                Err(error) => {
                    attempt += 1;
                    if !self.policy.can_retry(attempt) {
                        break error;
                    }
                    let delay = self.policy.delay_for(attempt);
                    self.metrics.retry_attempts_total.add(1, &bus_labels);
                    span.add_event(
                        spans::RETRY_EVENT,
                        vec![
                            attr(attrs::RETRY_ATTEMPT, attempt as i64),
                            attr(attrs::RETRY_DELAY_MS, delay.as_millis() as i64),
                        ],
                    );
                    debug!(
                        eventbus = %self.bus_name,
                        event_type = %self.event.message_type,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying event handler"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shutdown.changed() => {
                            debug!(
                                eventbus = %self.bus_name,
                                event_type = %self.event.message_type,
                                "delivery abandoned on shutdown"
                            );
                            span.end();
                            return;
                        }
                    }
                }
            }
        };

        // Retries exhausted.
        self.metrics.delivered_total.add(
            1,
            &[
                self.bus_name.as_str(),
                self.event.message_type.as_str(),
                labels::STATUS_ERROR,
            ],
        );
        self.metrics
            .handling_duration
            .record(started.elapsed().as_secs_f64(), &bus_labels);
        span.record_error(&failure);
        span.set_error(&failure.to_string());
        span.end();

        let wrapped = NimbusError::generic(format!(
            "Failed to handle event: {} from {}",
            self.event.message_type, self.event.source
        ))
        .with_source(Box::new(failure));

        match &self.subscription.on_error {
            Some(sink) => sink.on_error(&wrapped, &self.event).await,
            None => error!(
                eventbus = %self.bus_name,
                event_type = %self.event.message_type,
                event_id = %self.event.id,
                error = %wrapped,
                "event subscription failed after retries"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CapturingEventHandler, MockEventHandler};
    use nimbus_telemetry::meter::NoopMeter;
    use nimbus_telemetry::tracer::NoopTracer;
    use serde_json::json;
    use std::time::Duration;

    fn test_bus() -> EventBus {
        EventBus::new(
            "unit",
            EventBusConfig::default(),
            Arc::new(NoopTracer),
            &NoopMeter,
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = EventBusConfig::default();
        assert_eq!(config.max_event_size_bytes, 65536);
        assert!(!config.log_publish);
        assert_eq!(config.default_retry, RetryPolicy::default());
    }

    #[test]
    fn test_config_deserializes_with_missing_fields() {
        let config: EventBusConfig = serde_json::from_str("{\"log_publish\": true}").unwrap();
        assert!(config.log_publish);
        assert_eq!(config.max_event_size_bytes, MAX_EVENT_SIZE_BYTES);
    }

    #[test]
    fn test_subscription_counts_per_type() {
        let bus = test_bus();
        assert_eq!(bus.subscription_count("a"), 0);

        bus.subscribe_event(Subscription::new("a", Arc::new(MockEventHandler)));
        bus.subscribe_event(Subscription::new("a", Arc::new(MockEventHandler)));
        bus.subscribe_event(Subscription::new("b", Arc::new(MockEventHandler)));

        assert_eq!(bus.subscription_count("a"), 2);
        assert_eq!(bus.subscription_count("b"), 1);
        assert_eq!(bus.subscription_count("c"), 0);
    }

    #[tokio::test]
    async fn test_delivery_carries_the_published_event() {
        let bus = test_bus();
        let handler = CapturingEventHandler::new();
        bus.subscribe_event(Subscription::new("orders.placed", Arc::new(handler.clone())));

        let event = nimbus_domain::message::Message::event(
            "orders.placed",
            "https://shop/api",
            "order/7",
            json!({"total": 42}),
        )
        .build();
        bus.put_event(&event).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let delivered = handler.events();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0], event);
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: &Message) -> Result<(), NimbusError> {
            Err(NimbusError::generic("boom"))
        }
    }

    #[tokio::test]
    async fn test_error_sink_receives_the_wrapped_failure() {
        let bus = test_bus();
        let sink = crate::testing::CapturingErrorSink::new();
        bus.subscribe_event(
            Subscription::new("orders.poison", Arc::new(FailingHandler))
                .with_on_error(Arc::new(sink.clone()))
                .with_retry(RetryPolicy {
                    max_retries: 0,
                    base_delay_ms: 1,
                    max_delay_ms: 1,
                    use_jitter: false,
                }),
        );

        let event = nimbus_domain::message::Message::event(
            "orders.poison",
            "https://shop/api",
            "order/13",
            json!({}),
        )
        .build();
        bus.put_event(&event).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let errors = sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].0,
            "Failed to handle event: orders.poison from https://shop/api"
        );
        assert_eq!(errors[0].1.message_type, "orders.poison");
    }

    #[tokio::test]
    async fn test_events_of_other_types_are_not_delivered() {
        let bus = test_bus();
        let handler = CapturingEventHandler::new();
        bus.subscribe_event(Subscription::new("orders.placed", Arc::new(handler.clone())));

        let event = nimbus_domain::message::Message::event(
            "orders.cancelled",
            "https://shop/api",
            "order/7",
            json!({}),
        )
        .build();
        bus.put_event(&event).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handler.is_empty());
    }
}
