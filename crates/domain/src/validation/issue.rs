//! Structured validation issues.
//!
//! An [`Issue`] pinpoints one violation: where (`path`), what class of
//! violation (`code`), and a human-readable `message`, with `expected` /
//! `received` filled in for type-level mismatches. The serde shape is the
//! wire contract consumed by error details and transport adapters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Issue codes.
pub mod codes {
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const INVALID_LITERAL: &str = "invalid_literal";
    pub const INVALID_STRING: &str = "invalid_string";
    pub const INVALID_UNION: &str = "invalid_union";
    pub const TOO_SMALL: &str = "too_small";
    pub const CUSTOM: &str = "custom";
}

/// One step in the path from the validated root to the offending value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// One validation violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl Issue {
    /// The value exists but has the wrong JSON type.
    pub fn invalid_type(path: Vec<PathSegment>, expected: &str, received: &str) -> Self {
        Self {
            code: codes::INVALID_TYPE.to_string(),
            expected: Some(expected.to_string()),
            received: Some(received.to_string()),
            path,
            message: format!("Expected {expected}, received {received}"),
        }
    }

    /// A required key is missing entirely.
    pub fn required(path: Vec<PathSegment>, expected: &str) -> Self {
        Self {
            code: codes::INVALID_TYPE.to_string(),
            expected: Some(expected.to_string()),
            received: Some("undefined".to_string()),
            path,
            message: "Required".to_string(),
        }
    }

    /// The value does not equal the expected literal.
    pub fn invalid_literal(path: Vec<PathSegment>, expected: &Value, received: &Value) -> Self {
        let expected = expected.to_string();
        Self {
            message: format!("Invalid literal value, expected {expected}"),
            code: codes::INVALID_LITERAL.to_string(),
            expected: Some(expected),
            received: Some(received.to_string()),
            path,
        }
    }

    /// The value matches none of the union's alternatives.
    pub fn invalid_union(path: Vec<PathSegment>) -> Self {
        Self {
            code: codes::INVALID_UNION.to_string(),
            expected: None,
            received: None,
            path,
            message: "Invalid input".to_string(),
        }
    }

    /// A string fails a format constraint (uri, datetime, media type...).
    pub fn invalid_string(path: Vec<PathSegment>, message: &str) -> Self {
        Self {
            code: codes::INVALID_STRING.to_string(),
            expected: None,
            received: None,
            path,
            message: message.to_string(),
        }
    }

    /// A string is shorter than allowed (here: empty where non-empty is
    /// required).
    pub fn too_small(path: Vec<PathSegment>) -> Self {
        Self {
            code: codes::TOO_SMALL.to_string(),
            expected: None,
            received: None,
            path,
            message: "String must contain at least 1 character(s)".to_string(),
        }
    }

    pub fn custom(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            code: codes::CUSTOM.to_string(),
            expected: None,
            received: None,
            path,
            message: message.into(),
        }
    }
}

/// JSON type name of a value, as reported in `received`.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
