//! Shared harness for the end-to-end tests.
//!
//! Each test spawns its own mock provider and gateway on fixed ports,
//! then polls `/health` until both answer. Fresh key material is generated
//! per test run.

use clap::Parser;
use idgate_service::config::IdGateConfig;
use idp_mock::config::IdpMockConfig;
use tokio::sync::oneshot;

pub mod fakes;
pub mod keys;

use keys::KeyFiles;

/// A running provider/gateway pair for one test.
///
/// Both servers shut down when the rig is dropped.
pub struct TestRig {
    /// Base URL of the gateway.
    pub gateway_url: String,
    /// Base URL of the mock provider, also the token issuer.
    pub issuer_url: String,
    _keys: KeyFiles,
    _shutdown: Vec<oneshot::Sender<()>>,
}

/// Spawns the mock provider and the gateway on the two given ports.
pub async fn spawn_rig(gateway_port: u16, provider_port: u16) -> eyre::Result<TestRig> {
    spawn_rig_with_gateway_redirect(gateway_port, provider_port, None).await
}

/// Like [`spawn_rig`], but the gateway sends `gateway_redirect_uri` in its
/// token exchanges instead of the registered default.
pub async fn spawn_rig_with_gateway_redirect(
    gateway_port: u16,
    provider_port: u16,
    gateway_redirect_uri: Option<&str>,
) -> eyre::Result<TestRig> {
    let keys = keys::generate_key_files()?;
    let issuer_url = format!("http://localhost:{provider_port}");
    let gateway_url = format!("http://localhost:{gateway_port}");

    let provider_shutdown = spawn_provider(provider_port, &keys)?;
    let gateway_shutdown = spawn_gateway(gateway_port, &issuer_url, &keys, gateway_redirect_uri)?;

    wait_healthy(&format!("{issuer_url}/health")).await?;
    wait_healthy(&format!("{gateway_url}/health")).await?;

    Ok(TestRig {
        gateway_url,
        issuer_url,
        _keys: keys,
        _shutdown: vec![provider_shutdown, gateway_shutdown],
    })
}

/// Spawns only the gateway, pointed at a provider that does not exist.
pub async fn spawn_gateway_without_provider(
    gateway_port: u16,
    dead_provider_port: u16,
) -> eyre::Result<TestRig> {
    let keys = keys::generate_key_files()?;
    let issuer_url = format!("http://localhost:{dead_provider_port}");
    let gateway_url = format!("http://localhost:{gateway_port}");

    let gateway_shutdown = spawn_gateway(gateway_port, &issuer_url, &keys, None)?;
    wait_healthy(&format!("{gateway_url}/health")).await?;

    Ok(TestRig {
        gateway_url,
        issuer_url,
        _keys: keys,
        _shutdown: vec![gateway_shutdown],
    })
}

fn spawn_provider(port: u16, keys: &KeyFiles) -> eyre::Result<oneshot::Sender<()>> {
    let bind_addr = format!("127.0.0.1:{port}");
    let issuer = format!("http://localhost:{port}");
    let args: Vec<&str> = vec![
        "idp-mock",
        "--bind-addr",
        &bind_addr,
        "--issuer",
        &issuer,
        "--provider-keys-path",
        keys.provider_secret.to_str().ok_or_else(path_error)?,
        "--rp-keys-path",
        keys.rp_public.to_str().ok_or_else(path_error)?,
    ];
    let config = IdpMockConfig::parse_from(args);
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        if let Err(err) = idp_mock::start(config, async move {
            let _ = rx.await;
        })
        .await
        {
            tracing::error!("mock provider exited with error: {err:?}");
        }
    });
    Ok(tx)
}

fn spawn_gateway(
    port: u16,
    issuer_url: &str,
    keys: &KeyFiles,
    redirect_uri: Option<&str>,
) -> eyre::Result<oneshot::Sender<()>> {
    let bind_addr = format!("127.0.0.1:{port}");
    let token_endpoint = format!("{issuer_url}/token");
    let mut args: Vec<&str> = vec![
        "idgate-service",
        "--bind-addr",
        &bind_addr,
        "--issuer",
        issuer_url,
        "--token-endpoint",
        &token_endpoint,
        "--exchange-timeout",
        "2s",
        "--rp-keys-path",
        keys.rp_secret.to_str().ok_or_else(path_error)?,
        "--provider-keys-path",
        keys.provider_public.to_str().ok_or_else(path_error)?,
    ];
    if let Some(redirect_uri) = redirect_uri {
        args.extend(["--redirect-uri", redirect_uri]);
    }
    let config = IdGateConfig::parse_from(args);
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        if let Err(err) = idgate_service::start(config, async move {
            let _ = rx.await;
        })
        .await
        {
            tracing::error!("gateway exited with error: {err:?}");
        }
    });
    Ok(tx)
}

fn path_error() -> eyre::Report {
    eyre::eyre!("tempdir path is not valid UTF-8")
}

/// Polls a health endpoint until it answers 200, for at most 10 seconds.
pub async fn wait_healthy(url: &str) -> eyre::Result<()> {
    let client = reqwest::Client::new();
    tokio::time::timeout(std::time::Duration::from_secs(10), async {
        loop {
            if let Ok(response) = client.get(url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    })
    .await
    .map_err(|_| eyre::eyre!("{url} did not become healthy in time"))
}
