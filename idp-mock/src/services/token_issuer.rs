//! Issuing encrypted identity tokens.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use eyre::Context;
use idgate_jose::{jwe, JweError, JwkSet, KeyUse};
use idgate_types::api::v1::ClientAssertionClaims;
use idgate_types::claims::IdentityClaims;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::IdpMockConfig;

/// Errors while verifying an exchange or issuing a token.
#[derive(Debug, thiserror::Error)]
pub(crate) enum IssueError {
    /// The client assertion is missing, expired, badly signed or claims the
    /// wrong parties.
    #[error("invalid client assertion: {0}")]
    BadAssertion(String),
    /// Signing the identity token failed.
    #[error("failed to sign identity token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    /// Encrypting the identity token failed.
    #[error("failed to encrypt identity token: {0}")]
    Encryption(#[from] JweError),
}

/// Verifies client assertions and signs-then-encrypts identity tokens.
pub(crate) struct TokenIssuer {
    signing_key: EncodingKey,
    signing_kid: Option<String>,
    rp_assertion_key: DecodingKey,
    rp_encryption_key: p256::PublicKey,
    rp_encryption_kid: Option<String>,
    issuer: String,
    client_id: String,
    token_endpoint: String,
    token_lifetime: Duration,
    subject: String,
}

impl TokenIssuer {
    /// Loads both key-set documents and resolves all roles.
    pub(crate) fn init(config: &IdpMockConfig) -> eyre::Result<Self> {
        let provider_keys = JwkSet::from_path(&config.provider_keys_path).with_context(|| {
            format!(
                "while loading provider key-set from {}",
                config.provider_keys_path.display()
            )
        })?;
        let rp_keys = JwkSet::from_path(&config.rp_keys_path).with_context(|| {
            format!(
                "while loading relying party key-set from {}",
                config.rp_keys_path.display()
            )
        })?;

        let sig = provider_keys
            .key_for(KeyUse::Signature)
            .context("while resolving the provider signing key")?;
        let enc = rp_keys
            .key_for(KeyUse::Encryption)
            .context("while resolving the relying party encryption key")?;

        Ok(Self {
            signing_key: sig
                .es384_signing_key()
                .context("while converting the provider signing key")?,
            signing_kid: sig.kid.clone(),
            rp_assertion_key: rp_keys
                .key_for(KeyUse::Signature)
                .context("while resolving the relying party assertion key")?
                .es384_verifying_key()
                .context("while converting the relying party assertion key")?,
            rp_encryption_key: enc
                .p256_public_key()
                .context("while converting the relying party encryption key")?,
            rp_encryption_kid: enc.kid.clone(),
            issuer: config.issuer.clone(),
            client_id: config.client_id.clone(),
            token_endpoint: format!("{}/token", config.issuer),
            token_lifetime: config.token_lifetime,
            subject: config.subject.clone(),
        })
    }

    /// Verifies the signed client assertion of a token exchange.
    pub(crate) fn verify_client_assertion(&self, assertion: &str) -> Result<(), IssueError> {
        let mut validation = Validation::new(Algorithm::ES384);
        validation.set_audience(&[&self.token_endpoint]);
        let decoded = jsonwebtoken::decode::<ClientAssertionClaims>(
            assertion,
            &self.rp_assertion_key,
            &validation,
        )
        .map_err(|err| IssueError::BadAssertion(err.to_string()))?;
        if decoded.claims.iss != self.client_id || decoded.claims.sub != self.client_id {
            return Err(IssueError::BadAssertion(
                "issuer and subject must both be the client identifier".to_string(),
            ));
        }
        Ok(())
    }

    /// Signs an identity token for the fixed subject and encrypts it to the
    /// relying party.
    pub(crate) fn issue(&self, nonce: Option<String>) -> Result<String, IssueError> {
        let iat = unix_now();
        let claims = IdentityClaims {
            sub: self.subject.clone(),
            iat,
            exp: iat + self.token_lifetime.as_secs(),
            iss: Some(self.issuer.clone()),
            aud: Some(self.client_id.clone()),
            nonce,
            extra: serde_json::Map::new(),
        };
        let mut header = Header::new(Algorithm::ES384);
        header.kid = self.signing_kid.clone();
        let signed = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(IssueError::Signing)?;
        Ok(jwe::encrypt(
            signed.as_bytes(),
            &self.rp_encryption_key,
            self.rp_encryption_kid.as_deref(),
        )?)
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
    use clap::Parser;
    use idgate_jose::Jwk;
    use rand::rngs::OsRng;
    use std::io::Write as _;
    use uuid::Uuid;

    struct Fixture {
        issuer: TokenIssuer,
        rp_sig: p384::SecretKey,
        rp_enc: p256::SecretKey,
        provider_sig: p384::SecretKey,
    }

    fn write_set(keys: Vec<Jwk>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let doc = serde_json::json!({ "keys": keys });
        file.write_all(serde_json::to_string(&doc).unwrap().as_bytes())
            .unwrap();
        file
    }

    fn fixture() -> Fixture {
        let rp_sig = p384::SecretKey::random(&mut OsRng);
        let rp_enc = p256::SecretKey::random(&mut OsRng);
        let provider_sig = p384::SecretKey::random(&mut OsRng);

        let provider_file = write_set(vec![Jwk::from_p384_secret(&provider_sig, "idp-sig-1")]);
        let rp_file = write_set(vec![
            Jwk::from_p384_public(&rp_sig.public_key(), "sig-1"),
            Jwk::from_p256_public(&rp_enc.public_key(), "enc-1"),
        ]);

        let config = IdpMockConfig::parse_from([
            "test",
            "--provider-keys-path",
            provider_file.path().to_str().unwrap(),
            "--rp-keys-path",
            rp_file.path().to_str().unwrap(),
        ]);
        Fixture {
            issuer: TokenIssuer::init(&config).unwrap(),
            rp_sig,
            rp_enc,
            provider_sig,
        }
    }

    fn assertion(fixture: &Fixture, iss: &str, sub: &str, aud: &str) -> String {
        let iat = unix_now();
        let claims = ClientAssertionClaims {
            iss: iss.to_string(),
            sub: sub.to_string(),
            aud: aud.to_string(),
            jti: Uuid::new_v4(),
            iat,
            exp: iat + 300,
        };
        let key = Jwk::from_p384_secret(&fixture.rp_sig, "sig-1")
            .es384_signing_key()
            .unwrap();
        jsonwebtoken::encode(&Header::new(Algorithm::ES384), &claims, &key).unwrap()
    }

    #[test]
    fn accepts_a_well_formed_assertion() {
        let fixture = fixture();
        let assertion = assertion(
            &fixture,
            "idgate-rp",
            "idgate-rp",
            "http://localhost:5156/token",
        );
        fixture.issuer.verify_client_assertion(&assertion).unwrap();
    }

    #[test]
    fn rejects_wrong_audience() {
        let fixture = fixture();
        let assertion = assertion(&fixture, "idgate-rp", "idgate-rp", "http://elsewhere/token");
        assert!(matches!(
            fixture.issuer.verify_client_assertion(&assertion),
            Err(IssueError::BadAssertion(_))
        ));
    }

    #[test]
    fn rejects_foreign_issuer() {
        let fixture = fixture();
        let assertion = assertion(
            &fixture,
            "someone-else",
            "someone-else",
            "http://localhost:5156/token",
        );
        assert!(matches!(
            fixture.issuer.verify_client_assertion(&assertion),
            Err(IssueError::BadAssertion(_))
        ));
    }

    #[test]
    fn issued_token_decrypts_and_verifies() {
        let fixture = fixture();
        let encrypted = fixture.issuer.issue(Some("nonce-1".to_string())).unwrap();

        let plaintext = jwe::decrypt(&encrypted, &fixture.rp_enc).unwrap();
        let signed = String::from_utf8(plaintext).unwrap();

        let verifying_key = Jwk::from_p384_public(&fixture.provider_sig.public_key(), "idp-sig-1")
            .es384_verifying_key()
            .unwrap();
        let mut validation = Validation::new(Algorithm::ES384);
        validation.set_issuer(&["http://localhost:5156"]);
        validation.set_audience(&["idgate-rp"]);
        let decoded =
            jsonwebtoken::decode::<IdentityClaims>(&signed, &verifying_key, &validation).unwrap();
        assert_eq!(decoded.claims.nonce.as_deref(), Some("nonce-1"));
        assert_eq!(
            decoded.claims.sub,
            "s=S1234567A,u=11111111-1111-1111-1111-111111111111"
        );
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
    }
}
