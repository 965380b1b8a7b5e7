//! CloudEvents v1.0 message model.
//!
//! One `Message` struct covers the three message roles (commands, queries,
//! events); the factories differ in what they require and what they fill in.
//! Messages are immutable facts once built. The payload in `data` is never
//! validated here; that happens at the dispatch boundary against the schema
//! registered for the message type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use nimbus_shared::error::NimbusError;
use nimbus_shared::ids;

/// The only CloudEvents version the core accepts.
pub const SPEC_VERSION: &str = "1.0";

/// Content type assumed when the producer does not state one.
pub const DEFAULT_DATA_CONTENT_TYPE: &str = "application/json";

/// Role of a message in the system.
///
/// - `Command`: imperative write, routed to exactly one handler
/// - `Query`: read, routed to exactly one handler
/// - `Event`: fact about something that happened, fanned out to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Command,
    Query,
    Event,
}

/// A CloudEvents v1.0 message.
///
/// Serde field names are the wire names; unknown wire attributes are kept in
/// `extensions` so validation and re-serialization never drop them. String
/// fields that the wire may omit deserialize to `""` and are rejected by the
/// envelope schema rather than by the parser, which keeps parse errors and
/// validation errors distinguishable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub specversion: String,

    /// Globally unique id; factories mint a ULID.
    #[serde(default)]
    pub id: String,

    /// URI-reference identifying the producer context.
    #[serde(default)]
    pub source: String,

    /// Reverse-domain message type; the dispatch key.
    #[serde(rename = "type", default)]
    pub message_type: String,

    /// Links the causal chain of messages; factories mint one if absent and
    /// derived messages carry it forward.
    #[serde(rename = "correlationid", default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,

    /// Absolute URI of the payload schema, if the producer declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,

    /// Subject of the event inside the source context. Required for events,
    /// optional for commands, absent for queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Unknown CloudEvents extension attributes, preserved verbatim.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl Message {
    /// Start building a command.
    pub fn command(
        message_type: impl Into<String>,
        source: impl Into<String>,
        data: Value,
    ) -> MessageBuilder {
        MessageBuilder::new(message_type, source, data)
    }

    /// Start building a query. Queries carry no subject.
    pub fn query(
        message_type: impl Into<String>,
        source: impl Into<String>,
        data: Value,
    ) -> MessageBuilder {
        MessageBuilder::new(message_type, source, data)
    }

    /// Start building an event. Events must name a subject; there is no
    /// default for it.
    pub fn event(
        message_type: impl Into<String>,
        source: impl Into<String>,
        subject: impl Into<String>,
        data: Value,
    ) -> MessageBuilder {
        let mut builder = MessageBuilder::new(message_type, source, data);
        builder.message.subject = Some(subject.into());
        builder
    }

    /// Parse a wire-format JSON object into a message.
    ///
    /// Parsing is lenient about missing envelope attributes (the envelope
    /// schema reports those); it only fails on JSON that cannot be shaped
    /// into a message at all, e.g. a non-object or a malformed `time`.
    pub fn from_json(value: Value) -> Result<Self, NimbusError> {
        serde_json::from_value(value).map_err(NimbusError::invalid_input_from)
    }

    /// Serialize to the wire-format JSON object.
    pub fn to_json(&self) -> Result<Value, NimbusError> {
        serde_json::to_value(self).map_err(NimbusError::generic_from)
    }
}

/// Builder returned by the message factories.
///
/// `build` fills every defaultable attribute, so the result always satisfies
/// the envelope contract for attributes the producer may omit.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    fn new(message_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            message: Message {
                specversion: String::new(),
                id: String::new(),
                source: source.into(),
                message_type: message_type.into(),
                correlation_id: None,
                time: None,
                data,
                datacontenttype: None,
                dataschema: None,
                subject: None,
                extensions: BTreeMap::new(),
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.message.id = id.into();
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.message.correlation_id = Some(correlation_id.into());
        self
    }

    /// Carry the correlation id of a causally preceding message forward.
    pub fn correlated_with(mut self, parent: &Message) -> Self {
        self.message.correlation_id = parent.correlation_id.clone();
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.message.time = Some(time);
        self
    }

    pub fn with_datacontenttype(mut self, content_type: impl Into<String>) -> Self {
        self.message.datacontenttype = Some(content_type.into());
        self
    }

    pub fn with_dataschema(mut self, dataschema: impl Into<String>) -> Self {
        self.message.dataschema = Some(dataschema.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.message.subject = Some(subject.into());
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.message.extensions.insert(name.into(), value);
        self
    }

    /// Finish the message, filling defaults for anything not set:
    /// `specversion` is always forced to "1.0", `id` and `correlationid`
    /// get fresh ULIDs, `time` becomes now, `datacontenttype` becomes
    /// `application/json`.
    pub fn build(mut self) -> Message {
        self.message.specversion = SPEC_VERSION.to_string();
        if self.message.id.is_empty() {
            self.message.id = ids::ulid();
        }
        if self.message.correlation_id.is_none() {
            self.message.correlation_id = Some(ids::ulid());
        }
        if self.message.time.is_none() {
            self.message.time = Some(Utc::now());
        }
        if self.message.datacontenttype.is_none() {
            self.message.datacontenttype = Some(DEFAULT_DATA_CONTENT_TYPE.to_string());
        }
        self.message
    }
}
