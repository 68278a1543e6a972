//! Configuration types and CLI/environment parsing for the authentication
//! gateway.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

/// The configuration for the authentication gateway.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
pub struct IdGateConfig {
    /// The bind addr of the axum server.
    #[clap(long, env = "IDGATE_BIND_ADDR", default_value = "0.0.0.0:4000")]
    pub bind_addr: SocketAddr,

    /// The relying party's client identifier at the identity provider.
    #[clap(long, env = "IDGATE_CLIENT_ID", default_value = "idgate-rp")]
    pub client_id: String,

    /// The issuer the identity provider puts into its tokens.
    #[clap(
        long,
        env = "IDGATE_PROVIDER_ISSUER",
        default_value = "http://localhost:5156"
    )]
    pub issuer: String,

    /// The identity provider's token endpoint. Also the audience of every
    /// client assertion the gateway signs.
    #[clap(
        long,
        env = "IDGATE_PROVIDER_TOKEN_ENDPOINT",
        default_value = "http://localhost:5156/token"
    )]
    pub token_endpoint: String,

    /// The redirect URI used in the authorization request. The token
    /// exchange must send this byte-for-byte or the provider rejects it.
    #[clap(
        long,
        env = "IDGATE_REDIRECT_URI",
        default_value = "http://localhost:3000"
    )]
    pub redirect_uri: String,

    /// Path to the relying party's secret key-set document (one `sig` and
    /// one `enc` key).
    #[clap(long, env = "IDGATE_RP_KEYS_PATH")]
    pub rp_keys_path: PathBuf,

    /// Path to the identity provider's public key-set document (one `sig`
    /// key).
    #[clap(long, env = "IDGATE_PROVIDER_KEYS_PATH")]
    pub provider_keys_path: PathBuf,

    /// Max time to wait for the token exchange before giving up. The
    /// identity provider is an untrusted network peer; we never block
    /// indefinitely on it.
    #[clap(
        long,
        env = "IDGATE_EXCHANGE_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration
    )]
    pub exchange_timeout: Duration,
}
