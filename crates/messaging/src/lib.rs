//! In-process messaging for the Nimbus core.
//!
//! - `router`: type-keyed dispatch of commands and queries with schema
//!   validation at the boundary
//! - `bus`: async publish/subscribe fan-out with bounded retry and capped
//!   exponential backoff
//! - `retry`: the backoff policy shared by all subscriptions
//! - `registry`: named router/bus instances with lazy default construction
//! - `typed`: typed payload facade over the string-keyed dispatch
//! - `testing`: handler and sink doubles

pub mod bus;
pub mod registry;
pub mod retry;
pub mod router;
pub mod testing;
pub mod typed;

pub use bus::{
    error_sink_fn, event_handler_fn, ErrorSink, EventBus, EventBusConfig, EventHandler,
    Subscription, MAX_EVENT_SIZE_BYTES,
};
pub use registry::{
    default_event_bus, default_router, event_bus, router, setup_event_bus, setup_router,
    MessagingRegistry, DEFAULT_NAME,
};
pub use retry::RetryPolicy;
pub use router::{handler_fn, MessageHandler, MessageRouter, RouterConfig};
pub use typed::{
    typed_subscription, TypedEvent, TypedEventHandler, TypedMessage, TypedMessageHandler,
};
