//! # v1 API types
//!
//! Data transfer objects for version 1 of the authentication gateway API and
//! for the OAuth-shaped requests the gateway and client send to the identity
//! provider. Types here are plain serde structs so they can be sent over the
//! wire as JSON or form encoding.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::DecodedIdentityToken;

/// The fixed `client_assertion_type` URN for JWT bearer client assertions.
pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// The grant type used for the code-for-token exchange.
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// Successful response of the gateway's `GET /api/v1/callback` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    /// Human-readable status message.
    pub message: String,
    /// The decrypted identity token in its signed compact form.
    pub id_token: String,
    /// The decoded and verified identity token.
    pub user: DecodedIdentityToken,
}

/// Form body of the `POST /token` exchange at the identity provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenRequest {
    /// The single-use authorization code received at the callback.
    pub code: String,
    /// The relying party's client identifier.
    pub client_id: String,
    /// Always [`CLIENT_ASSERTION_TYPE_JWT_BEARER`].
    pub client_assertion_type: String,
    /// The signed client assertion proving key possession.
    pub client_assertion: String,
    /// Must byte-for-byte match the URI used in the authorization redirect.
    pub redirect_uri: String,
    /// Always [`GRANT_TYPE_AUTHORIZATION_CODE`].
    pub grant_type: String,
}

/// Successful response of the provider's token endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The encrypted identity token (compact JWE).
    pub id_token: String,
}

/// OAuth-style error body returned by the provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderError {
    /// Machine-readable error code, e.g. `invalid_grant`.
    pub error: String,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Query parameters of the provider's authorization endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// The relying party's client identifier.
    pub client_id: String,
    /// Where the provider redirects the browser back to (the client
    /// application's own origin and path, not the gateway).
    pub redirect_uri: String,
    /// Always `code`.
    pub response_type: String,
    /// Requested scopes; must include `openid`.
    pub scope: String,
    /// Random value bound into the issued identity token.
    pub nonce: Option<String>,
    /// Anti-forgery state echoed back on the callback.
    pub state: Option<String>,
}

/// Claims of the short-lived client assertion the gateway signs for every
/// token exchange.
///
/// `iss` and `sub` both equal the relying party's client identifier and
/// `aud` equals the provider's token endpoint. `exp` is at most 300 seconds
/// after `iat`, and `jti` is fresh per assertion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    /// Issuer: the relying party's client identifier.
    pub iss: String,
    /// Subject: equal to `iss`.
    pub sub: String,
    /// Audience: the provider's token endpoint URL.
    pub aud: String,
    /// Single-use assertion identifier.
    pub jti: Uuid,
    /// Unix timestamp the assertion was issued at.
    pub iat: u64,
    /// Unix timestamp the assertion expires at (`iat + 300`).
    pub exp: u64,
}
