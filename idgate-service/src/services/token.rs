//! Identity token decryption and verification.

use idgate_jose::{jwe, JweError};
use idgate_types::claims::{DecodedIdentityToken, IdentityClaims};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::instrument;

use crate::config::IdGateConfig;
use crate::services::key_material::KeyMaterial;

/// Errors of the decrypt-then-verify pipeline.
#[derive(Debug, thiserror::Error)]
pub(crate) enum TokenError {
    /// The outer encryption layer could not be removed.
    #[error("failed to decrypt ID token: {0}")]
    Decryption(#[from] JweError),
    /// The decrypted payload is not a UTF-8 compact JWS.
    #[error("decrypted ID token is not valid UTF-8")]
    NotUtf8,
    /// The signature or the registered claims did not check out.
    #[error("failed to verify decrypted ID token: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),
}

/// Decrypts identity tokens and verifies the inner signature and claims.
pub(crate) struct IdentityTokenVerifier {
    decryption_key: p256::SecretKey,
    provider_key: DecodingKey,
    validation: Validation,
}

impl IdentityTokenVerifier {
    pub(crate) fn init(config: &IdGateConfig, material: &KeyMaterial) -> Self {
        let mut validation = Validation::new(Algorithm::ES384);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.client_id]);
        Self {
            decryption_key: material.decryption_key.clone(),
            provider_key: material.provider_verifying_key.clone(),
            validation,
        }
    }

    /// Removes the encryption layer and verifies the signed token inside.
    ///
    /// Returns the signed compact form alongside the decoded token so callers
    /// can hand the former to clients without re-serializing claims.
    #[instrument(level = "debug", skip_all)]
    pub(crate) fn decrypt_and_verify(
        &self,
        encrypted: &str,
    ) -> Result<(String, DecodedIdentityToken), TokenError> {
        let plaintext = jwe::decrypt(encrypted, &self.decryption_key)?;
        let signed = String::from_utf8(plaintext).map_err(|_| TokenError::NotUtf8)?;
        let decoded =
            jsonwebtoken::decode::<IdentityClaims>(&signed, &self.provider_key, &self.validation)
                .map_err(TokenError::Verification)?;
        Ok((
            signed,
            DecodedIdentityToken {
                header: decoded.header,
                payload: decoded.claims,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_jose::Jwk;
    use jsonwebtoken::{EncodingKey, Header};
    use rand::rngs::OsRng;
    use std::time::{SystemTime, UNIX_EPOCH};

    struct Fixture {
        verifier: IdentityTokenVerifier,
        provider_signing_key: EncodingKey,
        rp_enc_public: p256::PublicKey,
    }

    fn fixture() -> Fixture {
        let rp_sig = p384::SecretKey::random(&mut OsRng);
        let rp_enc = p256::SecretKey::random(&mut OsRng);
        let idp_sig = p384::SecretKey::random(&mut OsRng);

        let config = config();
        let material = KeyMaterial {
            signing_key: Jwk::from_p384_secret(&rp_sig, "sig-1")
                .es384_signing_key()
                .unwrap(),
            signing_kid: Some("sig-1".to_string()),
            decryption_key: rp_enc.clone(),
            provider_verifying_key: Jwk::from_p384_public(&idp_sig.public_key(), "idp-sig-1")
                .es384_verifying_key()
                .unwrap(),
        };
        Fixture {
            verifier: IdentityTokenVerifier::init(&config, &material),
            provider_signing_key: Jwk::from_p384_secret(&idp_sig, "idp-sig-1")
                .es384_signing_key()
                .unwrap(),
            rp_enc_public: rp_enc.public_key(),
        }
    }

    fn config() -> IdGateConfig {
        use clap::Parser;
        IdGateConfig::parse_from([
            "test",
            "--rp-keys-path",
            "/dev/null",
            "--provider-keys-path",
            "/dev/null",
        ])
    }

    fn issue(fixture: &Fixture, signing_key: &EncodingKey) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = IdentityClaims {
            sub: "s=S1234567A,u=11111111-1111-1111-1111-111111111111".to_string(),
            iat: now,
            exp: now + 300,
            iss: Some("http://localhost:5156".to_string()),
            aud: Some("idgate-rp".to_string()),
            nonce: None,
            extra: serde_json::Map::new(),
        };
        let signed =
            jsonwebtoken::encode(&Header::new(Algorithm::ES384), &claims, signing_key).unwrap();
        jwe::encrypt(signed.as_bytes(), &fixture.rp_enc_public, Some("enc-1")).unwrap()
    }

    #[test]
    fn decrypts_and_verifies_a_provider_token() {
        let fixture = fixture();
        let encrypted = issue(&fixture, &fixture.provider_signing_key);
        let (signed, decoded) = fixture.verifier.decrypt_and_verify(&encrypted).unwrap();
        assert!(signed.split('.').count() == 3);
        assert_eq!(
            decoded.payload.subject_id().unwrap().nric,
            "S1234567A".to_string()
        );
    }

    #[test]
    fn wrong_encryption_recipient_fails_as_decryption() {
        let fixture = fixture();
        let other = p256::SecretKey::random(&mut OsRng).public_key();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = IdentityClaims {
            sub: "s=S1234567A,u=11111111-1111-1111-1111-111111111111".to_string(),
            iat: now,
            exp: now + 300,
            iss: Some("http://localhost:5156".to_string()),
            aud: Some("idgate-rp".to_string()),
            nonce: None,
            extra: serde_json::Map::new(),
        };
        let signed = jsonwebtoken::encode(
            &Header::new(Algorithm::ES384),
            &claims,
            &fixture.provider_signing_key,
        )
        .unwrap();
        let encrypted = jwe::encrypt(signed.as_bytes(), &other, None).unwrap();
        assert!(matches!(
            fixture.verifier.decrypt_and_verify(&encrypted),
            Err(TokenError::Decryption(_))
        ));
    }

    #[test]
    fn foreign_signer_fails_as_verification() {
        let fixture = fixture();
        let rogue = p384::SecretKey::random(&mut OsRng);
        let rogue_key = Jwk::from_p384_secret(&rogue, "rogue")
            .es384_signing_key()
            .unwrap();
        let encrypted = issue(&fixture, &rogue_key);
        assert!(matches!(
            fixture.verifier.decrypt_and_verify(&encrypted),
            Err(TokenError::Verification(_))
        ));
    }
}
