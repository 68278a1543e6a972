//! The code-for-token exchange with the identity provider.

use idgate_types::api::v1::{
    TokenRequest, TokenResponse, CLIENT_ASSERTION_TYPE_JWT_BEARER, GRANT_TYPE_AUTHORIZATION_CODE,
};
use tracing::instrument;

use crate::config::IdGateConfig;

/// Errors of the token exchange.
///
/// The distinction matters at the API boundary: a [`ProviderRejected`]
/// carries the provider's status and body onward, while transport problems
/// become an opaque server-side failure.
///
/// [`ProviderRejected`]: ExchangeError::ProviderRejected
#[derive(Debug, thiserror::Error)]
pub(crate) enum ExchangeError {
    /// The provider answered with a non-success status.
    #[error("token exchange rejected by authentication server ({status}): {body}")]
    ProviderRejected {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The provider never answered (connect failure, timeout, ..).
    #[error("no response from authentication server: {0}")]
    Transport(#[source] reqwest::Error),
    /// The request could not even be constructed.
    #[error("failed to construct token exchange request: {0}")]
    Setup(#[source] reqwest::Error),
    /// The provider answered 200 but the body is not a token response.
    #[error("could not decode token response: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

/// HTTP client performing the `POST /token` exchange.
pub(crate) struct TokenExchangeClient {
    client: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    redirect_uri: String,
}

impl TokenExchangeClient {
    /// Builds the exchange client with the configured request timeout.
    pub(crate) fn init(config: &IdGateConfig) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.exchange_timeout)
            .build()?;
        Ok(Self {
            client,
            token_endpoint: config.token_endpoint.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// Redeems an authorization code for the encrypted identity token.
    #[instrument(level = "debug", skip_all)]
    pub(crate) async fn exchange(
        &self,
        code: &str,
        client_assertion: &str,
    ) -> Result<String, ExchangeError> {
        let request = TokenRequest {
            code: code.to_string(),
            client_id: self.client_id.clone(),
            client_assertion_type: CLIENT_ASSERTION_TYPE_JWT_BEARER.to_string(),
            client_assertion: client_assertion.to_string(),
            redirect_uri: self.redirect_uri.clone(),
            grant_type: GRANT_TYPE_AUTHORIZATION_CODE.to_string(),
        };
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_builder() {
                    ExchangeError::Setup(err)
                } else {
                    ExchangeError::Transport(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::ProviderRejected { status, body });
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(ExchangeError::InvalidResponse)?;
        Ok(token.id_token)
    }
}
