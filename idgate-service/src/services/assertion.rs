//! Client assertion signing.
//!
//! Every token exchange carries a freshly signed, short-lived JWT proving the
//! gateway holds the relying party's registered signing key.

use std::time::{SystemTime, UNIX_EPOCH};

use idgate_types::api::v1::ClientAssertionClaims;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use uuid::Uuid;

/// Lifetime of a client assertion in seconds.
const ASSERTION_LIFETIME_SECS: u64 = 300;

/// Signs ES384 client assertions for the token exchange.
pub(crate) struct ClientAssertionSigner {
    signing_key: EncodingKey,
    kid: Option<String>,
    client_id: String,
    audience: String,
}

impl ClientAssertionSigner {
    pub(crate) fn new(
        signing_key: EncodingKey,
        kid: Option<String>,
        client_id: String,
        audience: String,
    ) -> Self {
        Self {
            signing_key,
            kid,
            client_id,
            audience,
        }
    }

    /// Produces a fresh assertion: `iss == sub == client_id`, `aud` is the
    /// token endpoint, `jti` is new per call and `exp` is 300s after `iat`.
    pub(crate) fn sign(&self) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = unix_now();
        let claims = ClientAssertionClaims {
            iss: self.client_id.clone(),
            sub: self.client_id.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::ES384);
        header.kid = self.kid.clone();
        jsonwebtoken::encode(&header, &claims, &self.signing_key)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_jose::Jwk;
    use jsonwebtoken::{DecodingKey, Validation};
    use rand::rngs::OsRng;

    fn signer() -> (ClientAssertionSigner, DecodingKey) {
        let secret = p384::SecretKey::random(&mut OsRng);
        let jwk = Jwk::from_p384_secret(&secret, "sig-1");
        let signing_key = jwk.es384_signing_key().unwrap();
        let verifying_key = jwk.es384_verifying_key().unwrap();
        (
            ClientAssertionSigner::new(
                signing_key,
                Some("sig-1".to_string()),
                "idgate-rp".to_string(),
                "http://localhost:5156/token".to_string(),
            ),
            verifying_key,
        )
    }

    fn decode(assertion: &str, key: &DecodingKey) -> ClientAssertionClaims {
        let mut validation = Validation::new(Algorithm::ES384);
        validation.set_audience(&["http://localhost:5156/token"]);
        jsonwebtoken::decode::<ClientAssertionClaims>(assertion, key, &validation)
            .unwrap()
            .claims
    }

    #[test]
    fn assertion_claims_are_well_formed() {
        let (signer, key) = signer();
        let claims = decode(&signer.sign().unwrap(), &key);
        assert_eq!(claims.iss, "idgate-rp");
        assert_eq!(claims.iss, claims.sub);
        assert_eq!(claims.exp - claims.iat, ASSERTION_LIFETIME_SECS);
    }

    #[test]
    fn every_assertion_has_a_fresh_jti() {
        let (signer, key) = signer();
        let first = decode(&signer.sign().unwrap(), &key);
        let second = decode(&signer.sign().unwrap(), &key);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn header_carries_algorithm_and_kid() {
        let (signer, _) = signer();
        let header = jsonwebtoken::decode_header(&signer.sign().unwrap()).unwrap();
        assert_eq!(header.alg, Algorithm::ES384);
        assert_eq!(header.kid.as_deref(), Some("sig-1"));
    }
}
