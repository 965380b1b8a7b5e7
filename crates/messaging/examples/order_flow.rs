//! End-to-end wiring demo: a command routed through a named router, a
//! correlated event fanned out on the bus, and the metrics that fall out.
//!
//! Run: cargo run -p nimbus-messaging --example order_flow

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::json;

use nimbus_domain::message::Message;
use nimbus_domain::validation::{schema, Field, Schema};
use nimbus_messaging::bus::{event_handler_fn, Subscription};
use nimbus_messaging::registry::MessagingRegistry;
use nimbus_messaging::router::handler_fn;
use nimbus_telemetry::meter::PrometheusMeter;
use nimbus_telemetry::tracer::OtelTracer;
use nimbus_telemetry::{init, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(&TelemetryConfig::default());

    let meter = Arc::new(PrometheusMeter::new());
    let registry = MessagingRegistry::new(Arc::new(OtelTracer::new("nimbus")), meter.clone());

    let router = registry.router("orders");
    let bus = registry.event_bus("orders");

    // Command handler: accept the order and publish the fact, carrying the
    // command's correlation id forward.
    let publish_bus = bus.clone();
    router.register(
        "order.place",
        handler_fn(move |message: Message| {
            let bus = publish_bus.clone();
            async move {
                let subject = format!("order/{}", message.data["orderId"]);
                let event = Message::event(
                    "order.placed",
                    "https://shop/orders",
                    subject,
                    message.data.clone(),
                )
                .correlated_with(&message)
                .build();
                bus.put_event(&event).await?;
                Ok(json!({"statusCode": 202, "data": {"accepted": true}}))
            }
            .boxed()
        }),
        Arc::new(schema::command(Schema::object(vec![
            Field::required("orderId", Schema::integer()),
            Field::required("total", Schema::number()),
        ]))),
    );

    bus.subscribe_event(Subscription::new(
        "order.placed",
        event_handler_fn(|event: Message| {
            async move {
                println!(
                    "billing saw {} for {} (correlation {:?})",
                    event.message_type,
                    event.subject.as_deref().unwrap_or("?"),
                    event.correlation_id
                );
                Ok(())
            }
            .boxed()
        }),
    ));

    let command = Message::command(
        "order.place",
        "https://shop/api",
        json!({"orderId": 7, "total": 99.5}),
    )
    .build();
    let result = router.route(&command).await?;
    println!("route result: {result}");

    tokio::time::sleep(Duration::from_millis(200)).await;
    println!("{}", meter.export());
    Ok(())
}
