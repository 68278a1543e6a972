//! Configuration of the mock identity provider.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use clap::Parser;

/// The environment the mock believes it runs in.
///
/// The mock issues tokens for a fixed subject without any real
/// authentication, so it refuses to start outside of `dev`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    /// Production deployment.
    Prod,
    /// Local development and tests.
    Dev,
}

impl Environment {
    /// Fails unless the environment is `dev`.
    pub fn assert_is_dev(&self) -> eyre::Result<()> {
        if *self != Environment::Dev {
            eyre::bail!("the mock identity provider only runs in the dev environment");
        }
        Ok(())
    }
}

/// The configuration for the mock identity provider.
#[derive(Parser, Debug)]
pub struct IdpMockConfig {
    /// The environment; anything but `dev` refuses to start.
    #[clap(long, env = "IDP_MOCK_ENVIRONMENT", value_enum, default_value = "dev")]
    pub environment: Environment,

    /// The bind addr of the axum server.
    #[clap(long, env = "IDP_MOCK_BIND_ADDR", default_value = "0.0.0.0:5156")]
    pub bind_addr: SocketAddr,

    /// The issuer written into every token. The token endpoint audience is
    /// `{issuer}/token`.
    #[clap(
        long,
        env = "IDP_MOCK_ISSUER",
        default_value = "http://localhost:5156"
    )]
    pub issuer: String,

    /// The only client the mock accepts.
    #[clap(long, env = "IDP_MOCK_CLIENT_ID", default_value = "idgate-rp")]
    pub client_id: String,

    /// The redirect URI registered for the client.
    #[clap(
        long,
        env = "IDP_MOCK_REDIRECT_URI",
        default_value = "http://localhost:3000"
    )]
    pub redirect_uri: String,

    /// Path to the provider's secret key-set document (one `sig` key).
    #[clap(long, env = "IDP_MOCK_PROVIDER_KEYS_PATH")]
    pub provider_keys_path: PathBuf,

    /// Path to the relying party's public key-set document (`sig` key to
    /// verify client assertions, `enc` key to encrypt tokens to).
    #[clap(long, env = "IDP_MOCK_RP_KEYS_PATH")]
    pub rp_keys_path: PathBuf,

    /// Lifetime of issued identity tokens.
    #[clap(
        long,
        env = "IDP_MOCK_TOKEN_LIFETIME",
        default_value = "5min",
        value_parser = humantime::parse_duration
    )]
    pub token_lifetime: Duration,

    /// The fixed subject every token is issued for.
    #[clap(
        long,
        env = "IDP_MOCK_SUBJECT",
        default_value = "s=S1234567A,u=11111111-1111-1111-1111-111111111111"
    )]
    pub subject: String,
}
