use std::sync::Arc;

use nimbus_messaging::bus::EventBusConfig;
use nimbus_messaging::registry::{
    default_event_bus, default_router, MessagingRegistry, DEFAULT_NAME,
};
use nimbus_messaging::router::RouterConfig;
use nimbus_telemetry::meter::NoopMeter;
use nimbus_telemetry::tracer::NoopTracer;

fn local_registry() -> MessagingRegistry {
    MessagingRegistry::new(Arc::new(NoopTracer), Arc::new(NoopMeter))
}

#[tokio::test]
async fn test_repeated_lookup_returns_the_same_router() {
    let registry = local_registry();

    let first = registry.router("orders");
    let second = registry.router("orders");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "orders");
}

#[tokio::test]
async fn test_repeated_lookup_returns_the_same_bus() {
    let registry = local_registry();

    let first = registry.event_bus("orders");
    let second = registry.event_bus("orders");
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_setup_replaces_the_registered_instance() {
    let registry = local_registry();

    let original = registry.setup_router("orders", RouterConfig::default());
    assert!(Arc::ptr_eq(&original, &registry.router("orders")));

    let replacement = registry.setup_router("orders", RouterConfig::default());
    assert!(!Arc::ptr_eq(&original, &replacement));
    assert!(Arc::ptr_eq(&replacement, &registry.router("orders")));

    let bus = registry.setup_event_bus("orders", EventBusConfig::default());
    let bus_replacement = registry.setup_event_bus("orders", EventBusConfig::default());
    assert!(!Arc::ptr_eq(&bus, &bus_replacement));
}

#[tokio::test]
async fn test_different_names_are_isolated() {
    let registry = local_registry();

    let billing = registry.router("billing");
    let shipping = registry.router("shipping");
    assert!(!Arc::ptr_eq(&billing, &shipping));

    billing.register(
        "invoice.create",
        nimbus_messaging::router::handler_fn(|_| {
            use futures::FutureExt;
            async { Ok(serde_json::json!(null)) }.boxed()
        }),
        Arc::new(nimbus_domain::validation::Schema::any()),
    );
    assert_eq!(billing.route_count(), 1);
    assert_eq!(shipping.route_count(), 0);
}

#[tokio::test]
async fn test_concurrent_first_access_constructs_once() {
    let registry = Arc::new(local_registry());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move { registry.router("race") }));
    }

    let mut routers = Vec::new();
    for handle in handles {
        routers.push(handle.await.unwrap());
    }
    assert!(routers
        .iter()
        .all(|router| Arc::ptr_eq(router, &routers[0])));
}

#[tokio::test]
async fn test_global_default_instances_are_singletons() {
    let router_a = default_router();
    let router_b = default_router();
    assert!(Arc::ptr_eq(&router_a, &router_b));
    assert_eq!(router_a.name(), DEFAULT_NAME);

    let bus_a = default_event_bus();
    let bus_b = default_event_bus();
    assert!(Arc::ptr_eq(&bus_a, &bus_b));
    assert_eq!(bus_a.name(), "default");
}
