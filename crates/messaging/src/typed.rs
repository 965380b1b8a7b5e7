//! Typed facade over the string-keyed router and bus.
//!
//! Handlers here work with concrete payload structs instead of raw JSON:
//! the adapters deserialize the message `data`, invoke the handler, and
//! serialize the result back. The wire contract stays exactly the same,
//! so typed and untyped registrations can coexist on one router.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use nimbus_domain::message::Message;
use nimbus_domain::validation::{schema, Schema};
use nimbus_shared::error::NimbusError;

use crate::bus::{EventBus, EventHandler, Subscription};
use crate::router::{MessageHandler, MessageRouter};

/// A command or query payload with a fixed wire type.
pub trait TypedMessage: DeserializeOwned + Send + 'static {
    /// Result handed back to the caller.
    type Output: Serialize + Send;

    /// Dispatch key this payload rides under.
    const MESSAGE_TYPE: &'static str;

    /// Schema of the `data` attribute; the envelope is added by the
    /// registration.
    fn data_schema() -> Schema {
        Schema::any()
    }
}

/// Handler for one typed command/query.
#[async_trait]
pub trait TypedMessageHandler<M: TypedMessage>: Send + Sync + 'static {
    /// `payload` is the deserialized `data`; `message` is the full
    /// envelope for correlation and metadata.
    async fn handle(&self, payload: M, message: &Message) -> Result<M::Output, NimbusError>;
}

/// An event payload with a fixed wire type.
pub trait TypedEvent: DeserializeOwned + Send + 'static {
    const EVENT_TYPE: &'static str;
}

/// Handler for one typed event.
#[async_trait]
pub trait TypedEventHandler<E: TypedEvent>: Send + Sync + 'static {
    async fn handle(&self, payload: E, event: &Message) -> Result<(), NimbusError>;
}

impl MessageRouter {
    /// Register a typed handler under `M::MESSAGE_TYPE`, wrapping
    /// `M::data_schema()` in the command envelope.
    pub fn register_command<M, H>(&self, handler: Arc<H>)
    where
        M: TypedMessage,
        H: TypedMessageHandler<M>,
    {
        self.register(
            M::MESSAGE_TYPE,
            Arc::new(TypedMessageAdapter {
                handler,
                _payload: PhantomData::<fn() -> M>,
            }),
            Arc::new(schema::command(M::data_schema())),
        );
    }

    /// Register a typed handler under `M::MESSAGE_TYPE`, wrapping
    /// `M::data_schema()` in the query envelope.
    pub fn register_query<M, H>(&self, handler: Arc<H>)
    where
        M: TypedMessage,
        H: TypedMessageHandler<M>,
    {
        self.register(
            M::MESSAGE_TYPE,
            Arc::new(TypedMessageAdapter {
                handler,
                _payload: PhantomData::<fn() -> M>,
            }),
            Arc::new(schema::query(M::data_schema())),
        );
    }
}

impl EventBus {
    /// Subscribe a typed handler to `E::EVENT_TYPE` with default retry
    /// behavior. Use [`typed_subscription`] to set a retry policy or an
    /// error sink.
    pub fn subscribe_typed<E, H>(&self, handler: Arc<H>)
    where
        E: TypedEvent,
        H: TypedEventHandler<E>,
    {
        self.subscribe_event(typed_subscription::<E, H>(handler));
    }
}

/// Build a [`Subscription`] from a typed handler, ready for
/// `with_retry`/`with_on_error` chaining.
pub fn typed_subscription<E, H>(handler: Arc<H>) -> Subscription
where
    E: TypedEvent,
    H: TypedEventHandler<E>,
{
    Subscription::new(
        E::EVENT_TYPE,
        Arc::new(TypedEventAdapter {
            handler,
            _payload: PhantomData::<fn() -> E>,
        }),
    )
}

struct TypedMessageAdapter<M, H> {
    handler: Arc<H>,
    _payload: PhantomData<fn() -> M>,
}

#[async_trait]
impl<M, H> MessageHandler for TypedMessageAdapter<M, H>
where
    M: TypedMessage,
    H: TypedMessageHandler<M>,
{
    async fn handle(&self, message: Message) -> Result<Value, NimbusError> {
        let payload: M =
            serde_json::from_value(message.data.clone()).map_err(NimbusError::invalid_input_from)?;
        let output = self.handler.handle(payload, &message).await?;
        serde_json::to_value(output).map_err(NimbusError::generic_from)
    }
}

struct TypedEventAdapter<E, H> {
    handler: Arc<H>,
    _payload: PhantomData<fn() -> E>,
}

#[async_trait]
impl<E, H> EventHandler for TypedEventAdapter<E, H>
where
    E: TypedEvent,
    H: TypedEventHandler<E>,
{
    async fn handle(&self, event: &Message) -> Result<(), NimbusError> {
        let payload: E =
            serde_json::from_value(event.data.clone()).map_err(NimbusError::invalid_input_from)?;
        self.handler.handle(payload, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBusConfig;
    use crate::router::RouterConfig;
    use nimbus_domain::validation::Field;
    use nimbus_telemetry::meter::NoopMeter;
    use nimbus_telemetry::tracer::NoopTracer;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct AdjustStock {
        sku: String,
        delta: i64,
    }

    impl TypedMessage for AdjustStock {
        type Output = i64;
        const MESSAGE_TYPE: &'static str = "inventory.stock.adjust";

        fn data_schema() -> Schema {
            Schema::object(vec![
                Field::required("sku", Schema::non_empty_string()),
                Field::required("delta", Schema::integer()),
            ])
        }
    }

    struct AdjustStockHandler;

    #[async_trait]
    impl TypedMessageHandler<AdjustStock> for AdjustStockHandler {
        async fn handle(
            &self,
            payload: AdjustStock,
            _message: &Message,
        ) -> Result<i64, NimbusError> {
            assert_eq!(payload.sku, "A-1");
            Ok(10 + payload.delta)
        }
    }

    #[derive(Debug, Deserialize)]
    struct StockAdjusted {
        delta: i64,
    }

    impl TypedEvent for StockAdjusted {
        const EVENT_TYPE: &'static str = "inventory.stock.adjusted";
    }

    struct SummingHandler {
        sum: AtomicI64,
    }

    #[async_trait]
    impl TypedEventHandler<StockAdjusted> for SummingHandler {
        async fn handle(&self, payload: StockAdjusted, _event: &Message) -> Result<(), NimbusError> {
            self.sum.fetch_add(payload.delta, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_router() -> MessageRouter {
        MessageRouter::new("typed", RouterConfig::default(), Arc::new(NoopTracer), &NoopMeter)
    }

    #[tokio::test]
    async fn test_typed_command_round_trips_through_the_router() {
        let router = test_router();
        router.register_command::<AdjustStock, _>(Arc::new(AdjustStockHandler));

        let message = Message::command(
            "inventory.stock.adjust",
            "https://shop/api",
            json!({"sku": "A-1", "delta": 5}),
        )
        .build();

        assert_eq!(router.route(&message).await.unwrap(), json!(15));
    }

    #[tokio::test]
    async fn test_typed_registration_keeps_the_declared_data_schema() {
        let router = test_router();
        router.register_command::<AdjustStock, _>(Arc::new(AdjustStockHandler));

        let message = Message::command(
            "inventory.stock.adjust",
            "https://shop/api",
            json!({"sku": "A-1", "delta": "five"}),
        )
        .build();

        let error = router.route(&message).await.unwrap_err();
        assert!(matches!(error, NimbusError::InvalidInput { .. }));
        assert_eq!(error.to_string(), "The provided input is invalid");
    }

    #[tokio::test]
    async fn test_typed_event_subscription_receives_the_payload() {
        let bus = EventBus::new(
            "typed",
            EventBusConfig::default(),
            Arc::new(NoopTracer),
            &NoopMeter,
        );
        let handler = Arc::new(SummingHandler {
            sum: AtomicI64::new(0),
        });
        bus.subscribe_typed::<StockAdjusted, _>(handler.clone());

        let event = Message::event(
            "inventory.stock.adjusted",
            "https://shop/api",
            "sku/A-1",
            json!({"delta": 7}),
        )
        .build();
        bus.put_event(&event).await.unwrap();
        bus.put_event(&event).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handler.sum.load(Ordering::SeqCst), 14);
    }
}
