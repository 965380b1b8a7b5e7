//! Type-keyed message router for commands and queries.
//!
//! Each named router holds a registry of `type -> (handler, schema)`.
//! Routing validates the whole message against the registered schema, then
//! dispatches on the caller's task. Handler errors pass through untouched
//! so callers can tell domain failures from routing failures; there are no
//! retries here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use nimbus_domain::message::Message;
use nimbus_domain::validation::{self, Validator};
use nimbus_shared::error::NimbusError;
use nimbus_shared::telemetry_names::{attrs, labels, metrics, spans, ROUTER_SYSTEM};
use nimbus_telemetry::meter::{Counter, Histogram, Meter, LATENCY_BUCKETS_SECONDS};
use nimbus_telemetry::tracer::{attr, SpanKind, Tracer};

/// Configuration for one router instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Log every inbound message at debug level before dispatch.
    #[serde(default)]
    pub log_input: bool,

    /// Log every handler result at debug level.
    #[serde(default)]
    pub log_output: bool,
}

/// Handles one message type.
///
/// The handler receives the already-validated message and returns an
/// arbitrary JSON result that the router hands back to the caller verbatim.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message) -> Result<Value, NimbusError>;
}

/// Wrap an async closure as a [`MessageHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn MessageHandler>
where
    F: Fn(Message) -> BoxFuture<'static, Result<Value, NimbusError>> + Send + Sync + 'static,
{
    Arc::new(FnMessageHandler(f))
}

struct FnMessageHandler<F>(F);

#[async_trait]
impl<F> MessageHandler for FnMessageHandler<F>
where
    F: Fn(Message) -> BoxFuture<'static, Result<Value, NimbusError>> + Send + Sync,
{
    async fn handle(&self, message: Message) -> Result<Value, NimbusError> {
        (self.0)(message).await
    }
}

#[derive(Clone)]
struct Route {
    handler: Arc<dyn MessageHandler>,
    schema: Arc<dyn Validator>,
}

#[derive(Clone)]
struct RouterMetrics {
    routed_total: Arc<dyn Counter>,
    routing_duration: Arc<dyn Histogram>,
}

impl RouterMetrics {
    fn new(meter: &dyn Meter) -> Self {
        Self {
            routed_total: meter.counter(
                metrics::ROUTER_MESSAGES_ROUTED_TOTAL,
                "Messages routed, by outcome",
                labels::ROUTER_ROUTED,
            ),
            routing_duration: meter.histogram(
                metrics::ROUTER_ROUTING_DURATION_SECONDS,
                "Routing duration in seconds",
                LATENCY_BUCKETS_SECONDS,
                labels::ROUTER_DURATION,
            ),
        }
    }
}

/// Named message router.
///
/// The route map is read-mostly: `register` takes the write lock briefly,
/// `route` clones the handles out under the read lock and never holds it
/// across an await.
pub struct MessageRouter {
    name: String,
    config: RouterConfig,
    routes: RwLock<HashMap<String, Route>>,
    tracer: Arc<dyn Tracer>,
    metrics: RouterMetrics,
}

impl MessageRouter {
    pub fn new(
        name: impl Into<String>,
        config: RouterConfig,
        tracer: Arc<dyn Tracer>,
        meter: &dyn Meter,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            routes: RwLock::new(HashMap::new()),
            tracer,
            metrics: RouterMetrics::new(meter),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a handler and schema for a message type.
    ///
    /// Registering an already-known type replaces the previous entry;
    /// last writer wins.
    pub fn register(
        &self,
        message_type: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
        schema: Arc<dyn Validator>,
    ) {
        let message_type = message_type.into();
        let replaced = self
            .routes
            .write()
            .insert(message_type.clone(), Route { handler, schema })
            .is_some();
        info!(
            router = %self.name,
            message_type = %message_type,
            replaced,
            "registered message handler"
        );
    }

    pub fn route_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Validate and dispatch one message, returning the handler result.
    pub async fn route(&self, message: &Message) -> Result<Value, NimbusError> {
        let started = Instant::now();
        let destination = if message.message_type.is_empty() {
            "unknown".to_string()
        } else {
            message.message_type.clone()
        };

        let mut span_attrs = vec![
            attr(attrs::MESSAGING_SYSTEM, ROUTER_SYSTEM),
            attr(attrs::ROUTER_NAME, self.name.clone()),
            attr(attrs::OPERATION, attrs::OP_ROUTE),
            attr(attrs::DESTINATION, destination.clone()),
        ];
        if let Some(correlation_id) = &message.correlation_id {
            span_attrs.push(attr(attrs::CORRELATION_ID, correlation_id.clone()));
        }
        let mut span = self
            .tracer
            .start_span(spans::ROUTER_ROUTE, SpanKind::Internal, span_attrs);

        let result = self.dispatch(message).await;
        let duration = started.elapsed().as_secs_f64();
        let duration_labels = [self.name.as_str(), destination.as_str()];

        match &result {
            Ok(output) => {
                if self.config.log_output {
                    debug!(router = %self.name, output = %output, "handler result");
                }
                self.metrics.routed_total.add(
                    1,
                    &[
                        self.name.as_str(),
                        destination.as_str(),
                        labels::STATUS_SUCCESS,
                    ],
                );
                self.metrics
                    .routing_duration
                    .record(duration, &duration_labels);
            }
            Err(error) => {
                span.record_error(error);
                span.set_error(&error.to_string());
                self.metrics.routed_total.add(
                    1,
                    &[
                        self.name.as_str(),
                        destination.as_str(),
                        labels::STATUS_ERROR,
                    ],
                );
                self.metrics
                    .routing_duration
                    .record(duration, &duration_labels);
            }
        }
        span.end();
        result
    }

    async fn dispatch(&self, message: &Message) -> Result<Value, NimbusError> {
        if self.config.log_input {
            debug!(router = %self.name, message = ?message, "routing message");
        }

        if message.message_type.is_empty() {
            return Err(NimbusError::invalid_input(
                "The provided input has no type attribute",
            ));
        }

        let route = match self.routes.read().get(&message.message_type) {
            Some(route) => route.clone(),
            None => {
                return Err(NimbusError::not_found("Route handler not found").with_details(
                    json!({
                        "reason": format!(
                            "no handler registered for type {}",
                            message.message_type
                        )
                    }),
                ));
            }
        };

        let wire = message.to_json()?;
        if let Err(issues) = route.schema.validate(&wire) {
            return Err(validation::invalid_input_error(issues));
        }

        route.handler.handle(message.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticMessageHandler;
    use nimbus_domain::validation::Schema;
    use nimbus_telemetry::meter::NoopMeter;
    use nimbus_telemetry::tracer::NoopTracer;
    use serde_json::json;

    fn test_router(config: RouterConfig) -> MessageRouter {
        MessageRouter::new("unit", config, Arc::new(NoopTracer), &NoopMeter)
    }

    #[test]
    fn test_config_defaults_to_quiet_logging() {
        let config = RouterConfig::default();
        assert!(!config.log_input);
        assert!(!config.log_output);
    }

    #[test]
    fn test_config_deserializes_with_missing_fields() {
        let config: RouterConfig = serde_json::from_str("{\"log_input\": true}").unwrap();
        assert!(config.log_input);
        assert!(!config.log_output);
    }

    #[tokio::test]
    async fn test_registrations_are_visible_to_subsequent_routes() {
        let router = test_router(RouterConfig::default());
        assert_eq!(router.route_count(), 0);

        router.register(
            "audit.append",
            StaticMessageHandler::new(json!({"ok": true})),
            Arc::new(Schema::any()),
        );
        assert_eq!(router.route_count(), 1);

        let message = nimbus_domain::message::Message::command(
            "audit.append",
            "https://x/api",
            json!({}),
        )
        .build();
        assert_eq!(router.route(&message).await.unwrap(), json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_verbose_logging_config_does_not_change_results() {
        let router = test_router(RouterConfig {
            log_input: true,
            log_output: true,
        });
        router.register(
            "audit.append",
            StaticMessageHandler::new(json!(1)),
            Arc::new(Schema::any()),
        );

        let message = nimbus_domain::message::Message::command(
            "audit.append",
            "https://x/api",
            json!({}),
        )
        .build();
        assert_eq!(router.route(&message).await.unwrap(), json!(1));
    }
}
