//! Observability: logging and metrics.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(log_level: &str, json_logging: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init tracing: {}", e))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to init tracing: {}", e))?;
    }

    Ok(())
}

/// Install the Prometheus recorder and return the render handle for the
/// `/metrics` endpoint.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(handle)
}

/// Register all metric descriptions.
pub fn register_metrics() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        "gather_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "gather_events_deleted_total",
        "Total number of events deleted"
    );
    describe_counter!(
        "gather_event_transitions_total",
        "Moderation status transitions"
    );
    describe_counter!(
        "gather_registrations_total",
        "Registration attempts by outcome"
    );
    describe_counter!(
        "gather_registration_conflicts_total",
        "Registration transactions retried after a write conflict"
    );
    describe_counter!(
        "gather_errors_total",
        "Errors surfaced at component boundaries"
    );
    describe_counter!(
        "gather_auth_errors_total",
        "Rejected authentication attempts"
    );
    describe_histogram!(
        "gather_request_duration_seconds",
        "HTTP request latency in seconds"
    );
}
