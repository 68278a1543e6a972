//! HTTP client for the authentication gateway.

use idgate_types::api::v1::CallbackResponse;

use crate::flow::AuthFlowError;

/// Redeems authorization codes at the gateway's callback endpoint.
pub(crate) struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub(crate) fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// `GET {gateway}/api/v1/callback?code=..`
    ///
    /// A non-success answer surfaces as [`AuthFlowError::Gateway`] with the
    /// gateway's status and body.
    pub(crate) async fn redeem_code(&self, code: &str) -> Result<CallbackResponse, AuthFlowError> {
        let response = self
            .http
            .get(format!("{}/api/v1/callback", self.base_url))
            .query(&[("code", code)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthFlowError::Gateway {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<CallbackResponse>().await?)
    }
}
