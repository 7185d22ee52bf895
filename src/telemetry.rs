use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;
use crate::observability::workflow_metrics;

/// Initialize structured logging on stderr, keeping stdout for command output.
/// RUST_LOG wins over the configured level when present.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    workflow_metrics().set_enabled(observability.metrics_enabled);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))?;

    if observability.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()?;
    }

    tracing::info!(
        metrics_enabled = observability.metrics_enabled,
        "Borehole workflow telemetry initialized"
    );
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span carrying the request's borehole, actor and correlation id
pub fn create_workflow_span(
    operation: &str,
    borehole_id: i64,
    actor_id: i64,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "workflow_request",
        operation = operation,
        borehole.id = borehole_id,
        actor.id = actor_id,
        correlation.id = correlation_id,
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    tracing::info!("Borehole workflow telemetry shutdown complete");
}
