#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use nimbus_domain::message::Message;
use nimbus_messaging::bus::{EventBus, EventBusConfig, EventHandler};
use nimbus_messaging::router::{MessageRouter, RouterConfig};
use nimbus_shared::error::NimbusError;
use nimbus_telemetry::testing::{RecordingMeter, RecordingTracer};

pub fn recording_router(name: &str) -> (MessageRouter, RecordingTracer, RecordingMeter) {
    let tracer = RecordingTracer::new();
    let meter = RecordingMeter::new();
    let router = MessageRouter::new(name, RouterConfig::default(), Arc::new(tracer.clone()), &meter);
    (router, tracer, meter)
}

pub fn recording_bus(
    name: &str,
    config: EventBusConfig,
) -> (EventBus, RecordingTracer, RecordingMeter) {
    let tracer = RecordingTracer::new();
    let meter = RecordingMeter::new();
    let bus = EventBus::new(name, config, Arc::new(tracer.clone()), &meter);
    (bus, tracer, meter)
}

/// Event handler that counts invocations and fails until a given attempt.
pub struct FlakyHandler {
    calls: AtomicU32,
    succeed_on: u32,
}

impl FlakyHandler {
    /// Succeeds on the `n`-th invocation, failing before that.
    pub fn succeeding_on(n: u32) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            succeed_on: n,
        })
    }

    /// Never succeeds.
    pub fn always_failing() -> Arc<Self> {
        Self::succeeding_on(u32::MAX)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for FlakyHandler {
    async fn handle(&self, _event: &Message) -> Result<(), NimbusError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call >= self.succeed_on {
            Ok(())
        } else {
            Err(NimbusError::generic("transient failure"))
        }
    }
}
