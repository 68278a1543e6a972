//! Client flow configuration.

/// Endpoints and identifiers the authentication flow needs.
///
/// Defaults match a local development setup with the identity provider on
/// port 5156 and the gateway on port 4000.
#[derive(Clone, Debug)]
pub struct AuthFlowConfig {
    /// The identity provider's authorization endpoint.
    pub authorize_endpoint: String,
    /// The authentication gateway's base URL.
    pub gateway_url: String,
    /// The relying party's client identifier.
    pub client_id: String,
    /// Where the provider redirects the browser back to.
    pub redirect_uri: String,
    /// Requested scopes; must include `openid`.
    pub scope: String,
}

impl Default for AuthFlowConfig {
    fn default() -> Self {
        Self {
            authorize_endpoint: "http://localhost:5156/authorize".to_string(),
            gateway_url: "http://localhost:4000".to_string(),
            client_id: "idgate-rp".to_string(),
            redirect_uri: "http://localhost:3000".to_string(),
            scope: "openid".to_string(),
        }
    }
}
