use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so the
/// narration printed on stdout stays clean.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", observability.log_level, e))?;

    let json_layer = observability.json_logs.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
    });
    let compact_layer = (!observability.json_logs).then(|| {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span carrying the workflow attributes shared by every log line
/// emitted underneath it
pub fn create_workflow_span(
    operation: &str,
    workflow_id: &str,
    run_id: Option<u64>,
) -> tracing::Span {
    tracing::info_span!(
        "kyc_workflow",
        operation = operation,
        workflow.id = workflow_id,
        run.id = run_id,
        correlation.id = %generate_correlation_id(),
        otel.kind = "internal"
    )
}

pub fn shutdown_telemetry() {
    // Formatting layers write synchronously; nothing to flush
    tracing::debug!("Telemetry shutdown complete");
}
