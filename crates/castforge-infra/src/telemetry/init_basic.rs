use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize process-wide tracing. Respects `RUST_LOG`; falls back to a sensible default.
pub fn init_telemetry(default_filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("telemetry shutdown");
}
