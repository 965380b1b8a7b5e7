//! Test doubles for handlers and error sinks.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use nimbus_domain::message::Message;
use nimbus_shared::error::NimbusError;

use crate::bus::{ErrorSink, EventHandler};
use crate::router::MessageHandler;

/// Event handler that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockEventHandler;

#[async_trait]
impl EventHandler for MockEventHandler {
    async fn handle(&self, _event: &Message) -> Result<(), NimbusError> {
        Ok(())
    }
}

/// Event handler that records every delivered event.
#[derive(Clone, Default)]
pub struct CapturingEventHandler {
    events: Arc<Mutex<Vec<Message>>>,
}

impl CapturingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Message> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventHandler for CapturingEventHandler {
    async fn handle(&self, event: &Message) -> Result<(), NimbusError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Error sink that records every `(error message, event)` pair.
#[derive(Clone, Default)]
pub struct CapturingErrorSink {
    errors: Arc<Mutex<Vec<(String, Message)>>>,
}

impl CapturingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<(String, Message)> {
        self.errors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }
}

#[async_trait]
impl ErrorSink for CapturingErrorSink {
    async fn on_error(&self, error: &NimbusError, event: &Message) {
        self.errors.lock().push((error.to_string(), event.clone()));
    }
}

/// Message handler that always returns the same value.
pub struct StaticMessageHandler {
    value: Value,
}

impl StaticMessageHandler {
    pub fn new(value: Value) -> Arc<Self> {
        Arc::new(Self { value })
    }
}

#[async_trait]
impl MessageHandler for StaticMessageHandler {
    async fn handle(&self, _message: Message) -> Result<Value, NimbusError> {
        Ok(self.value.clone())
    }
}
