//! Error taxonomy for the messaging core.
//!
//! A closed set of error kinds with HTTP status-code affinities. Every kind
//! carries a human-readable message, an optional structured `details`
//! payload, and an optional boxed source error so foreign failures keep
//! their cause chain when wrapped.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result type used across the messaging core.
pub type NimbusResult<T, E = NimbusError> = Result<T, E>;

/// Boxed foreign error kept as the cause of a wrapped taxonomy error.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Messaging-core error.
///
/// Kinds map onto transport status codes at the edge:
/// `InvalidInput` 400, `Unauthorized` 401, `Forbidden` 403, `NotFound` 404,
/// `Generic` 500. `Unauthorized`/`Forbidden` are reserved for transport
/// adapters; the core itself raises the other three.
#[derive(Debug, Error)]
pub enum NimbusError {
    /// The input failed validation or is structurally unusable.
    #[error("{message}")]
    InvalidInput {
        message: String,
        details: Option<Value>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Authentication is missing or invalid.
    #[error("{message}")]
    Unauthorized {
        message: String,
        details: Option<Value>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The caller is authenticated but not allowed.
    #[error("{message}")]
    Forbidden {
        message: String,
        details: Option<Value>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// No handler or resource exists for the dispatch key.
    #[error("{message}")]
    NotFound {
        message: String,
        details: Option<Value>,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Internal failure, including wrapped foreign errors.
    #[error("{message}")]
    Generic {
        message: String,
        details: Option<Value>,
        #[source]
        source: Option<BoxedSource>,
    },
}

macro_rules! impl_error_kind {
    ($ctor:ident, $from:ident, $variant:ident) => {
        pub fn $ctor(message: impl Into<String>) -> Self {
            Self::$variant {
                message: message.into(),
                details: None,
                source: None,
            }
        }

        /// Wrap a foreign error, adopting its message and keeping it as
        /// the cause.
        pub fn $from<E>(error: E) -> Self
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            Self::$variant {
                message: error.to_string(),
                details: None,
                source: Some(Box::new(error)),
            }
        }
    };
}

impl NimbusError {
    impl_error_kind!(invalid_input, invalid_input_from, InvalidInput);
    impl_error_kind!(unauthorized, unauthorized_from, Unauthorized);
    impl_error_kind!(forbidden, forbidden_from, Forbidden);
    impl_error_kind!(not_found, not_found_from, NotFound);
    impl_error_kind!(generic, generic_from, Generic);

    /// `InvalidInput` carrying a validator issue list under `details.issues`.
    pub fn invalid_input_with_issues<T: Serialize>(message: impl Into<String>, issues: &T) -> Self {
        let issues = serde_json::to_value(issues).unwrap_or_default();
        Self::invalid_input(message).with_details(serde_json::json!({ "issues": issues }))
    }

    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            Self::InvalidInput { details, .. }
            | Self::Unauthorized { details, .. }
            | Self::Forbidden { details, .. }
            | Self::NotFound { details, .. }
            | Self::Generic { details, .. } => *details = Some(value),
        }
        self
    }

    pub fn with_source(mut self, cause: BoxedSource) -> Self {
        match &mut self {
            Self::InvalidInput { source, .. }
            | Self::Unauthorized { source, .. }
            | Self::Forbidden { source, .. }
            | Self::NotFound { source, .. }
            | Self::Generic { source, .. } => *source = Some(cause),
        }
        self
    }

    /// Stable kind name, independent of the message.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "InvalidInput",
            Self::Unauthorized { .. } => "Unauthorized",
            Self::Forbidden { .. } => "Forbidden",
            Self::NotFound { .. } => "NotFound",
            Self::Generic { .. } => "Generic",
        }
    }

    /// HTTP status-code affinity of this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Generic { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message, .. }
            | Self::Unauthorized { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Generic { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::InvalidInput { details, .. }
            | Self::Unauthorized { details, .. }
            | Self::Forbidden { details, .. }
            | Self::NotFound { details, .. }
            | Self::Generic { details, .. } => details.as_ref(),
        }
    }
}
