//! Shared kernel for the Nimbus messaging core.
//!
//! - `ids`: sortable message identifiers and timestamps
//! - `error`: the closed error taxonomy used across all crates
//! - `telemetry_names`: span/metric/attribute names (public API)

pub mod error;
pub mod ids;
pub mod telemetry_names;

pub use error::{NimbusError, NimbusResult};
