//! # Authentication Gateway
//!
//! The relying-party side of a delegated identity-authentication flow. The
//! gateway exposes a single callback endpoint that redeems a one-time
//! authorization code at the identity provider, decrypts the returned
//! identity token and verifies its signature and claims before handing the
//! result to the client application.
//!
//! Start it with [`start`], which serves until the provided shutdown signal
//! resolves.

#![deny(missing_docs)]

use std::future::Future;
use std::sync::Arc;

use axum::extract::FromRef;
use eyre::Context;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod metrics;
pub mod telemetry;

pub(crate) mod api;
pub(crate) mod services;

use config::IdGateConfig;
use services::gateway::AuthGatewayService;
use services::key_material::KeyMaterial;

/// The shared state of the axum server.
#[derive(Clone)]
pub(crate) struct AppState {
    gateway: AuthGatewayService,
}

impl FromRef<AppState> for AuthGatewayService {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

/// Returns a string with the crate name and version.
pub fn version_info() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Starts the authentication gateway and serves until `shutdown_signal`
/// resolves.
pub async fn start(
    config: IdGateConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    tracing::info!("starting authentication gateway with config: {config:?}");

    let material = KeyMaterial::load(&config.rp_keys_path, &config.provider_keys_path)
        .context("while loading key material")?;
    let gateway = AuthGatewayService::init(&config, material)
        .context("while initializing the authentication pipeline")?;
    let state = AppState { gateway };

    let cancellation_token = spawn_shutdown_task(shutdown_signal);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("while binding to {}", config.bind_addr))?;
    tracing::info!("listening on {}", config.bind_addr);

    let router = api::build()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
        .context("while serving the API")?;

    tracing::info!("authentication gateway stopped");
    Ok(())
}

/// Spawns a task that cancels the returned token once `shutdown_signal`
/// resolves.
fn spawn_shutdown_task(
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> CancellationToken {
    let cancellation_token = CancellationToken::new();
    let cloned_token = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown_signal.await;
        tracing::info!("received shutdown signal");
        cloned_token.cancel();
    });
    cancellation_token
}

/// The default shutdown signal: Ctrl-C or SIGTERM.
pub async fn default_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl-C handler: {err}");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("failed to install SIGTERM handler: {err}"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
