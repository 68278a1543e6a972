//! # Mock Identity Provider
//!
//! A stand-in identity provider for local development and end-to-end tests.
//! It speaks the same authorize/token surface as the real provider, issues
//! single-use authorization codes without a login UI and returns signed,
//! encrypted identity tokens for one fixed subject.
//!
//! Refuses to start outside of the `dev` environment.

#![deny(missing_docs)]

use std::future::Future;
use std::sync::Arc;

use eyre::Context;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod config;

pub(crate) mod api;
pub(crate) mod services;

use config::IdpMockConfig;
use services::code_store::CodeStore;
use services::token_issuer::TokenIssuer;

/// The shared state of the axum server.
#[derive(Clone)]
pub(crate) struct AppState {
    config: Arc<IdpMockConfig>,
    codes: CodeStore,
    issuer: Arc<TokenIssuer>,
}

/// Returns a string with the crate name and version.
pub fn version_info() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Starts the mock identity provider and serves until `shutdown_signal`
/// resolves.
pub async fn start(
    config: IdpMockConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    config.environment.assert_is_dev()?;
    tracing::info!("starting mock identity provider with config: {config:?}");

    let issuer = TokenIssuer::init(&config).context("while initializing the token issuer")?;
    let state = AppState {
        codes: CodeStore::default(),
        issuer: Arc::new(issuer),
        config: Arc::new(config),
    };

    let cancellation_token = spawn_shutdown_task(shutdown_signal);

    let bind_addr = state.config.bind_addr;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("while binding to {bind_addr}"))?;
    tracing::info!("listening on {bind_addr}");

    let router = api::build()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
        .context("while serving the API")?;

    tracing::info!("mock identity provider stopped");
    Ok(())
}

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
