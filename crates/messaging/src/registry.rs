//! Named router and event-bus instances.
//!
//! A [`MessagingRegistry`] is an ordinary value that can be injected where
//! explicit wiring is wanted; the process-global returned by
//! [`MessagingRegistry::global`] covers the common case. Lookups create
//! missing instances with default options under the map lock, so
//! concurrent first access constructs exactly once.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use nimbus_telemetry::meter::{Meter, PrometheusMeter};
use nimbus_telemetry::tracer::{OtelTracer, Tracer};

use crate::bus::{EventBus, EventBusConfig};
use crate::router::{MessageRouter, RouterConfig};

/// Name used when the caller does not pick one.
pub const DEFAULT_NAME: &str = "default";

static GLOBAL: LazyLock<MessagingRegistry> = LazyLock::new(|| {
    MessagingRegistry::new(
        Arc::new(OtelTracer::new("nimbus")),
        Arc::new(PrometheusMeter::new()),
    )
});

/// Registry of named routers and event buses.
pub struct MessagingRegistry {
    tracer: Arc<dyn Tracer>,
    meter: Arc<dyn Meter>,
    routers: Mutex<HashMap<String, Arc<MessageRouter>>>,
    buses: Mutex<HashMap<String, Arc<EventBus>>>,
}

impl MessagingRegistry {
    /// A registry whose lazily-created instances use the given providers.
    pub fn new(tracer: Arc<dyn Tracer>, meter: Arc<dyn Meter>) -> Self {
        Self {
            tracer,
            meter,
            routers: Mutex::new(HashMap::new()),
            buses: Mutex::new(HashMap::new()),
        }
    }

    /// The process-global registry.
    pub fn global() -> &'static MessagingRegistry {
        &GLOBAL
    }

    /// Create and register a router, replacing any existing one of the
    /// same name.
    pub fn setup_router(&self, name: impl Into<String>, config: RouterConfig) -> Arc<MessageRouter> {
        let name = name.into();
        let router = Arc::new(MessageRouter::new(
            name.clone(),
            config,
            self.tracer.clone(),
            self.meter.as_ref(),
        ));
        self.routers.lock().insert(name, router.clone());
        router
    }

    /// The named router, created with default options on first access.
    pub fn router(&self, name: &str) -> Arc<MessageRouter> {
        self.routers
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MessageRouter::new(
                    name.to_string(),
                    RouterConfig::default(),
                    self.tracer.clone(),
                    self.meter.as_ref(),
                ))
            })
            .clone()
    }

    /// Create and register an event bus, replacing any existing one of
    /// the same name.
    pub fn setup_event_bus(&self, name: impl Into<String>, config: EventBusConfig) -> Arc<EventBus> {
        let name = name.into();
        let bus = Arc::new(EventBus::new(
            name.clone(),
            config,
            self.tracer.clone(),
            self.meter.as_ref(),
        ));
        self.buses.lock().insert(name, bus.clone());
        bus
    }

    /// The named event bus, created with default options on first access.
    pub fn event_bus(&self, name: &str) -> Arc<EventBus> {
        self.buses
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(EventBus::new(
                    name.to_string(),
                    EventBusConfig::default(),
                    self.tracer.clone(),
                    self.meter.as_ref(),
                ))
            })
            .clone()
    }
}

/// `setup_router` on the process-global registry.
pub fn setup_router(name: impl Into<String>, config: RouterConfig) -> Arc<MessageRouter> {
    MessagingRegistry::global().setup_router(name, config)
}

/// `router` on the process-global registry.
pub fn router(name: &str) -> Arc<MessageRouter> {
    MessagingRegistry::global().router(name)
}

/// The "default" router on the process-global registry.
pub fn default_router() -> Arc<MessageRouter> {
    router(DEFAULT_NAME)
}

/// `setup_event_bus` on the process-global registry.
pub fn setup_event_bus(name: impl Into<String>, config: EventBusConfig) -> Arc<EventBus> {
    MessagingRegistry::global().setup_event_bus(name, config)
}

/// `event_bus` on the process-global registry.
pub fn event_bus(name: &str) -> Arc<EventBus> {
    MessagingRegistry::global().event_bus(name)
}

/// The "default" event bus on the process-global registry.
pub fn default_event_bus() -> Arc<EventBus> {
    event_bus(DEFAULT_NAME)
}
