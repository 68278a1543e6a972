//! Telemetry setup for the authentication gateway.
//!
//! Centralizes initialization of observability:
//!
//! * Logging/tracing via a `tracing-subscriber` registry with human-readable
//!   formatting and an environment-based filter.
//! * An optional Prometheus scrape exporter for the `metrics` facade.
//!
//! Call [`initialize_telemetry`] once at startup.

use std::net::SocketAddr;

use eyre::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Telemetry configuration, typically read from the environment via
/// [`TelemetryConfig::try_from_env`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Bind address of the Prometheus scrape endpoint, if metrics are
    /// exported at all.
    pub metrics_bind_addr: Option<SocketAddr>,
}

impl TelemetryConfig {
    /// Build a [`TelemetryConfig`] from environment variables.
    ///
    /// Looks for `IDGATE_METRICS_BIND_ADDR`.
    pub fn try_from_env() -> eyre::Result<Self> {
        let metrics_bind_addr = match std::env::var("IDGATE_METRICS_BIND_ADDR") {
            Ok(addr) => Some(
                addr.parse()
                    .context("during reading IDGATE_METRICS_BIND_ADDR from environment")?,
            ),
            Err(std::env::VarError::NotPresent) => None,
            Err(e) => {
                eyre::bail!(
                    "Failed to read IDGATE_METRICS_BIND_ADDR from environment: {}",
                    e
                );
            }
        };
        Ok(Self { metrics_bind_addr })
    }
}

/// Initializes structured logging and, if configured, the Prometheus scrape
/// metrics exporter.
///
/// This is intended as a one-time setup call during service startup.
pub fn initialize_telemetry(config: &TelemetryConfig) -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_line_number(false),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idgate_service=debug,idp_mock=debug,info".into()),
        )
        .init();

    if let Some(bind_addr) = config.metrics_bind_addr {
        tracing::debug!("Setting up Prometheus scrape metrics exporter ..");
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(bind_addr)
            .install()
            .context("during installing Prometheus scrape metrics exporter as global recorder")?;
    }
    Ok(())
}
