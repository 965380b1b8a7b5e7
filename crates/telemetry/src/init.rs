//! Process-wide telemetry initialization.

use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Configuration for telemetry setup.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported with traces.
    pub service_name: String,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "nimbus".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Initialize logging and context propagation.
///
/// Safe to call more than once; only the first call installs the
/// subscriber.
pub fn init(config: &TelemetryConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let installed = if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    };

    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    if installed {
        info!(service = %config.service_name, "telemetry initialized");
    }
}
