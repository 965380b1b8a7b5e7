//! Message model for the Nimbus core, following the CloudEvents v1.0
//! attribute set, plus the schema-validation contract the router dispatches
//! against.
//!
//! - `message`: the `Message` struct, kinds, and factories that fill defaults
//! - `validation`: format primitives, structured issues, and the `Validator`
//!   capability with hand-written schema combinators

pub mod message;
pub mod validation;

pub use message::{Message, MessageBuilder, MessageKind};
pub use validation::{Issue, Schema, Validator};
