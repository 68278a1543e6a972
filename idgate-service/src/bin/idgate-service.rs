use std::process::ExitCode;

use clap::Parser;
use idgate_service::config::IdGateConfig;
use idgate_service::telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    let telemetry_config = TelemetryConfig::try_from_env()?;
    idgate_service::telemetry::initialize_telemetry(&telemetry_config)?;
    idgate_service::metrics::describe_metrics();

    tracing::info!("{}", idgate_service::version_info());

    let config = IdGateConfig::parse();
    match idgate_service::start(config, idgate_service::default_shutdown_signal()).await {
        Ok(()) => {
            tracing::info!("good night!");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!("{err:?}");
            Ok(ExitCode::FAILURE)
        }
    }
}
