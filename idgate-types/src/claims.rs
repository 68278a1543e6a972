//! The verified claims set carried inside an identity token.

use serde::{Deserialize, Serialize};

use crate::{SubjectId, SubjectIdError};

/// The claims set of a decrypted identity token.
///
/// Known fields are typed; everything else the provider includes ends up in
/// the [`extra`](Self::extra) extension bag untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// The composite subject identifier (see [`SubjectId`] for the format).
    pub sub: String,
    /// Unix timestamp the token was issued at.
    pub iat: u64,
    /// Unix timestamp the token expires at.
    pub exp: u64,
    /// Issuer of the token (the identity provider).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience of the token (the relying party's client id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// The nonce round-tripped from the authorization request, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Provider-defined extension claims.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IdentityClaims {
    /// Parses the composite `sub` claim into its components.
    pub fn subject_id(&self) -> Result<SubjectId, SubjectIdError> {
        self.sub.parse()
    }
}

/// An identity token after decryption and verification: the JOSE header
/// alongside the decoded claims.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedIdentityToken {
    /// The header of the inner signed token.
    pub header: jsonwebtoken::Header,
    /// The verified claims.
    pub payload: IdentityClaims,
}
