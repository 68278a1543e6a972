//! Startup loading of the gateway's key material.

use std::path::Path;

use eyre::Context;
use idgate_jose::{JwkSet, KeyUse};
use jsonwebtoken::{DecodingKey, EncodingKey};

/// All cryptographic keys the gateway needs, resolved once at startup.
///
/// Loading fails fast on a missing role or unusable key so a misconfigured
/// gateway never accepts traffic.
pub(crate) struct KeyMaterial {
    /// ES384 key signing client assertions.
    pub(crate) signing_key: EncodingKey,
    /// Identifier of the signing key, sent in assertion headers.
    pub(crate) signing_kid: Option<String>,
    /// P-256 key decrypting identity tokens.
    pub(crate) decryption_key: p256::SecretKey,
    /// ES384 key verifying the provider's token signatures.
    pub(crate) provider_verifying_key: DecodingKey,
}

impl KeyMaterial {
    /// Loads both key-set documents and resolves the three key roles.
    pub(crate) fn load(
        rp_keys_path: impl AsRef<Path>,
        provider_keys_path: impl AsRef<Path>,
    ) -> eyre::Result<Self> {
        let rp_keys = JwkSet::from_path(rp_keys_path.as_ref()).with_context(|| {
            format!(
                "while loading relying party key-set from {}",
                rp_keys_path.as_ref().display()
            )
        })?;
        let provider_keys = JwkSet::from_path(provider_keys_path.as_ref()).with_context(|| {
            format!(
                "while loading provider key-set from {}",
                provider_keys_path.as_ref().display()
            )
        })?;

        let sig = rp_keys
            .key_for(KeyUse::Signature)
            .context("while resolving the relying party signing key")?;
        let signing_key = sig
            .es384_signing_key()
            .context("while converting the relying party signing key")?;
        let decryption_key = rp_keys
            .key_for(KeyUse::Encryption)
            .context("while resolving the relying party encryption key")?
            .p256_secret_key()
            .context("while converting the relying party encryption key")?;
        let provider_verifying_key = provider_keys
            .key_for(KeyUse::Signature)
            .context("while resolving the provider verification key")?
            .es384_verifying_key()
            .context("while converting the provider verification key")?;

        Ok(Self {
            signing_key,
            signing_kid: sig.kid.clone(),
            decryption_key,
            provider_verifying_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idgate_jose::Jwk;
    use rand::rngs::OsRng;
    use std::io::Write as _;

    fn write_set(keys: Vec<Jwk>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let doc = serde_json::json!({ "keys": keys });
        file.write_all(serde_json::to_string(&doc).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn loads_complete_documents() {
        let sig = p384::SecretKey::random(&mut OsRng);
        let enc = p256::SecretKey::random(&mut OsRng);
        let provider_sig = p384::SecretKey::random(&mut OsRng);

        let rp = write_set(vec![
            Jwk::from_p384_secret(&sig, "sig-1"),
            Jwk::from_p256_secret(&enc, "enc-1"),
        ]);
        let provider = write_set(vec![Jwk::from_p384_public(
            &provider_sig.public_key(),
            "idp-sig-1",
        )]);

        let material = KeyMaterial::load(rp.path(), provider.path()).unwrap();
        assert_eq!(material.signing_kid.as_deref(), Some("sig-1"));
    }

    #[test]
    fn missing_encryption_key_fails_fast() {
        let sig = p384::SecretKey::random(&mut OsRng);
        let rp = write_set(vec![Jwk::from_p384_secret(&sig, "sig-1")]);
        let provider = write_set(vec![Jwk::from_p384_public(&sig.public_key(), "idp-sig-1")]);
        assert!(KeyMaterial::load(rp.path(), provider.path()).is_err());
    }

    #[test]
    fn missing_document_fails_fast() {
        let sig = p384::SecretKey::random(&mut OsRng);
        let provider = write_set(vec![Jwk::from_p384_public(&sig.public_key(), "idp-sig-1")]);
        assert!(KeyMaterial::load("/does/not/exist.json", provider.path()).is_err());
    }
}
