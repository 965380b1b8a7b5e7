//! Message identifier and timestamp generation.
//!
//! Ids are ULIDs: 26 characters, lexicographically sortable, monotonic
//! within a millisecond so ids minted in a tight loop still sort in
//! creation order.

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use std::sync::LazyLock;
use ulid::{Generator, Ulid};

static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// Generate a new ULID string.
pub fn ulid() -> String {
    let mut generator = GENERATOR.lock();
    match generator.generate() {
        Ok(id) => id.to_string(),
        // Random-part overflow inside a single millisecond; a fresh ULID
        // keeps uniqueness at the cost of monotonicity for this one id.
        Err(_) => Ulid::new().to_string(),
    }
}

/// Current time as an RFC 3339 timestamp with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
