//! Validation contract for the dispatch boundary.
//!
//! The router depends only on the [`Validator`] capability; the default
//! implementation is the hand-written [`Schema`] combinator set in
//! [`schema`], which reports structured [`Issue`] lists instead of opaque
//! strings. Format checks live in [`primitives`].

pub mod issue;
pub mod primitives;
pub mod schema;

pub use issue::{codes, json_kind, Issue, PathSegment};
pub use schema::{Field, Format, Schema, Validator};

use nimbus_shared::error::NimbusError;

/// Map a validator's issue list to the canonical dispatch-boundary error.
pub fn invalid_input_error(issues: Vec<Issue>) -> NimbusError {
    NimbusError::invalid_input_with_issues("The provided input is invalid", &issues)
}
