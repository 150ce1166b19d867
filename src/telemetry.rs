use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize tracing with either JSON or human-readable output.
/// `RUST_LOG` overrides the configured level when set.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(observability.log_level.as_str()));

    if observability.json_logs {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()?;
    }

    tracing::debug!("Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span carrying the attributes of one transition operation
pub fn create_transition_span(
    operation: &str,
    subject: &str,
    transition_type: Option<&str>,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "state_transition",
        operation = operation,
        subject = subject,
        transition.kind = transition_type,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Flush and report before exit
pub fn shutdown_telemetry() {
    crate::observability::transition_metrics().log_stats();
    tracing::debug!("Telemetry shutdown complete");
}
