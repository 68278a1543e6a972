//! The authentication pipeline behind the callback endpoint.

use std::sync::Arc;

use idgate_types::api::v1::CallbackResponse;
use tracing::instrument;

use crate::config::IdGateConfig;
use crate::metrics::{
    METRICS_KEY_CALLBACK_SUCCESS, METRICS_KEY_EXCHANGE_REJECTED, METRICS_KEY_EXCHANGE_TRANSPORT,
    METRICS_KEY_TOKEN_DECRYPTION_FAILED, METRICS_KEY_TOKEN_VERIFICATION_FAILED,
};
use crate::services::assertion::ClientAssertionSigner;
use crate::services::exchange::{ExchangeError, TokenExchangeClient};
use crate::services::key_material::KeyMaterial;
use crate::services::token::{IdentityTokenVerifier, TokenError};

/// Errors of the end-to-end authentication pipeline.
#[derive(Debug, thiserror::Error)]
pub(crate) enum GatewayError {
    /// Signing the client assertion failed.
    #[error("failed to build client assertion: {0}")]
    Assertion(#[source] jsonwebtoken::errors::Error),
    /// The token exchange failed.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    /// The returned identity token could not be decrypted or verified.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Orchestrates assertion signing, code exchange and token verification.
#[derive(Clone)]
pub(crate) struct AuthGatewayService {
    signer: Arc<ClientAssertionSigner>,
    exchange: Arc<TokenExchangeClient>,
    verifier: Arc<IdentityTokenVerifier>,
}

impl AuthGatewayService {
    /// Initializes the pipeline from config and the loaded key material.
    pub(crate) fn init(config: &IdGateConfig, material: KeyMaterial) -> eyre::Result<Self> {
        let verifier = IdentityTokenVerifier::init(config, &material);
        let signer = ClientAssertionSigner::new(
            material.signing_key,
            material.signing_kid,
            config.client_id.clone(),
            config.token_endpoint.clone(),
        );
        let exchange = TokenExchangeClient::init(config)?;
        Ok(Self {
            signer: Arc::new(signer),
            exchange: Arc::new(exchange),
            verifier: Arc::new(verifier),
        })
    }

    /// Runs the full pipeline for one authorization code.
    #[instrument(level = "debug", skip_all)]
    pub(crate) async fn authenticate(&self, code: &str) -> Result<CallbackResponse, GatewayError> {
        let assertion = self.signer.sign().map_err(GatewayError::Assertion)?;
        tracing::debug!("client assertion built");

        let encrypted = self.exchange.exchange(code, &assertion).await.map_err(|err| {
            match &err {
                ExchangeError::ProviderRejected { .. } => {
                    metrics::counter!(METRICS_KEY_EXCHANGE_REJECTED).increment(1);
                }
                ExchangeError::Transport(_) => {
                    metrics::counter!(METRICS_KEY_EXCHANGE_TRANSPORT).increment(1);
                }
                _ => {}
            }
            err
        })?;
        tracing::debug!("tokens exchanged");

        let (id_token, user) = self.verifier.decrypt_and_verify(&encrypted).map_err(|err| {
            match &err {
                TokenError::Decryption(_) | TokenError::NotUtf8 => {
                    metrics::counter!(METRICS_KEY_TOKEN_DECRYPTION_FAILED).increment(1);
                }
                TokenError::Verification(_) => {
                    metrics::counter!(METRICS_KEY_TOKEN_VERIFICATION_FAILED).increment(1);
                }
            }
            err
        })?;
        tracing::debug!("identity token verified");

        metrics::counter!(METRICS_KEY_CALLBACK_SUCCESS).increment(1);
        Ok(CallbackResponse {
            message: "authentication successful".to_string(),
            id_token,
            user,
        })
    }
}
