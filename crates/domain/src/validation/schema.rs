//! Hand-written schema combinators backing the `Validator` capability.
//!
//! Schemas operate on `serde_json::Value` in non-strict mode: unknown keys
//! pass through untouched, so CloudEvents extension attributes survive the
//! dispatch boundary. All issues are collected in one pass rather than
//! failing on the first.

use serde_json::Value;

use super::issue::{json_kind, Issue, PathSegment};
use super::primitives;
use crate::message::{MessageKind, SPEC_VERSION};

/// Capability the router dispatches against. Implementations may be the
/// built-in [`Schema`] combinators, a closure, or any hand-rolled checker.
pub trait Validator: Send + Sync {
    /// Validate `value`, returning the (unmodified, non-strict) value on
    /// success or the full list of violations.
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>>;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<Value, Vec<Issue>> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        self(value)
    }
}

/// String format constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    UriReference,
    AbsoluteUri,
    DateTime,
    MediaType,
}

impl Format {
    fn check(self, value: &str) -> bool {
        match self {
            Self::UriReference => primitives::is_uri_reference(value),
            Self::AbsoluteUri => primitives::is_absolute_uri(value),
            Self::DateTime => primitives::is_rfc3339_datetime(value),
            Self::MediaType => primitives::is_media_type(value),
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Self::UriReference => "Invalid uri reference",
            Self::AbsoluteUri => "Invalid uri",
            Self::DateTime => "Invalid datetime",
            Self::MediaType => "Invalid media type",
        }
    }
}

/// One field of an object schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    schema: Schema,
    required: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            required: false,
        }
    }
}

/// Composable value schema.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Accepts anything present.
    Any,
    Bool,
    Number,
    /// Number without a fractional part.
    Integer,
    String {
        non_empty: bool,
    },
    /// Exact JSON value.
    Literal(Value),
    /// String with a format constraint.
    Format(Format),
    Array(Box<Schema>),
    /// Object with named fields; unknown keys pass (non-strict).
    Object(Vec<Field>),
    /// Accepts a value matching any of the alternatives.
    Union(Vec<Schema>),
}

impl Schema {
    pub fn any() -> Self {
        Self::Any
    }

    pub fn boolean() -> Self {
        Self::Bool
    }

    pub fn number() -> Self {
        Self::Number
    }

    pub fn integer() -> Self {
        Self::Integer
    }

    pub fn string() -> Self {
        Self::String { non_empty: false }
    }

    pub fn non_empty_string() -> Self {
        Self::String { non_empty: true }
    }

    pub fn literal(value: Value) -> Self {
        Self::Literal(value)
    }

    pub fn format(format: Format) -> Self {
        Self::Format(format)
    }

    pub fn array(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    pub fn object(fields: Vec<Field>) -> Self {
        Self::Object(fields)
    }

    pub fn union(alternatives: Vec<Schema>) -> Self {
        Self::Union(alternatives)
    }

    /// Type name reported in `expected` for missing or mistyped values.
    fn type_name(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::Bool => "boolean".to_string(),
            Self::Number => "number".to_string(),
            Self::Integer => "integer".to_string(),
            Self::String { .. } | Self::Format(_) => "string".to_string(),
            Self::Literal(value) => value.to_string(),
            Self::Array(_) => "array".to_string(),
            Self::Object(_) => "object".to_string(),
            Self::Union(alternatives) => alternatives
                .iter()
                .map(Schema::type_name)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn check(&self, value: &Value, path: &mut Vec<PathSegment>, issues: &mut Vec<Issue>) {
        match self {
            Self::Any => {}
            Self::Bool => {
                if !value.is_boolean() {
                    issues.push(Issue::invalid_type(path.clone(), "boolean", json_kind(value)));
                }
            }
            Self::Number => {
                if !value.is_number() {
                    issues.push(Issue::invalid_type(path.clone(), "number", json_kind(value)));
                }
            }
            Self::Integer => {
                if !value.is_i64() && !value.is_u64() {
                    issues.push(Issue::invalid_type(path.clone(), "integer", json_kind(value)));
                }
            }
            Self::String { non_empty } => match value.as_str() {
                None => {
                    issues.push(Issue::invalid_type(path.clone(), "string", json_kind(value)));
                }
                Some(s) if *non_empty && s.is_empty() => {
                    issues.push(Issue::too_small(path.clone()));
                }
                Some(_) => {}
            },
            Self::Literal(expected) => {
                if value != expected {
                    issues.push(Issue::invalid_literal(path.clone(), expected, value));
                }
            }
            Self::Format(format) => match value.as_str() {
                None => {
                    issues.push(Issue::invalid_type(path.clone(), "string", json_kind(value)));
                }
                Some(s) if !format.check(s) => {
                    issues.push(Issue::invalid_string(path.clone(), format.failure_message()));
                }
                Some(_) => {}
            },
            Self::Array(items) => match value.as_array() {
                None => {
                    issues.push(Issue::invalid_type(path.clone(), "array", json_kind(value)));
                }
                Some(elements) => {
                    for (index, element) in elements.iter().enumerate() {
                        path.push(index.into());
                        items.check(element, path, issues);
                        path.pop();
                    }
                }
            },
            Self::Object(fields) => match value.as_object() {
                None => {
                    issues.push(Issue::invalid_type(path.clone(), "object", json_kind(value)));
                }
                Some(map) => {
                    for field in fields {
                        match map.get(&field.name) {
                            Some(inner) => {
                                path.push(field.name.as_str().into());
                                field.schema.check(inner, path, issues);
                                path.pop();
                            }
                            None if field.required => {
                                let mut missing = path.clone();
                                missing.push(field.name.as_str().into());
                                issues.push(Issue::required(missing, &field.schema.type_name()));
                            }
                            None => {}
                        }
                    }
                }
            },
            Self::Union(alternatives) => {
                let matches_any = alternatives.iter().any(|alternative| {
                    let mut alt_issues = Vec::new();
                    alternative.check(value, path, &mut alt_issues);
                    alt_issues.is_empty()
                });
                if !matches_any {
                    issues.push(Issue::invalid_union(path.clone()));
                }
            }
        }
    }
}

impl Validator for Schema {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let mut issues = Vec::new();
        self.check(value, &mut Vec::new(), &mut issues);
        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }
}

/// Envelope schema for a message role, with `data` accepted as-is.
pub fn envelope(kind: MessageKind) -> Schema {
    with_data(kind, Schema::any())
}

/// Command schema: envelope plus the caller's `data` schema.
pub fn command(data: Schema) -> Schema {
    with_data(MessageKind::Command, data)
}

/// Query schema: envelope plus the caller's `data` schema.
pub fn query(data: Schema) -> Schema {
    with_data(MessageKind::Query, data)
}

/// Event schema: envelope (subject required) plus the caller's `data`
/// schema.
pub fn event(data: Schema) -> Schema {
    with_data(MessageKind::Event, data)
}

fn with_data(kind: MessageKind, data: Schema) -> Schema {
    let mut fields = vec![
        Field::required("specversion", Schema::literal(Value::String(SPEC_VERSION.into()))),
        Field::required("id", Schema::non_empty_string()),
        Field::required("source", Schema::format(Format::UriReference)),
        Field::required("type", Schema::non_empty_string()),
        Field::required("correlationid", Schema::non_empty_string()),
        Field::optional("time", Schema::format(Format::DateTime)),
        Field::required("data", data),
        Field::optional("datacontenttype", Schema::format(Format::MediaType)),
        Field::optional("dataschema", Schema::format(Format::AbsoluteUri)),
    ];
    match kind {
        MessageKind::Event => fields.push(Field::required("subject", Schema::non_empty_string())),
        MessageKind::Command => fields.push(Field::optional("subject", Schema::non_empty_string())),
        // Queries carry no subject; non-strict mode means a stray one is
        // preserved, not rejected.
        MessageKind::Query => {}
    }
    Schema::object(fields)
}
