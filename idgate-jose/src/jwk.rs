//! JWK key-set documents and key-role resolution.
//!
//! A key-set document is a JSON object `{"keys": [...]}` where every key is
//! an EC JWK tagged with a usage role (`sig` or `enc`). The relying party's
//! secret document carries a P-384 signing key and a P-256 encryption key;
//! the provider's public document carries the P-384 verification key.

use std::fmt;
use std::fs::File;
use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p384::pkcs8::{EncodePrivateKey, LineEnding};
use serde::{Deserialize, Serialize};

/// Errors raised while loading or converting key material.
///
/// Any of these at startup means the gateway is misconfigured and must not
/// accept traffic.
#[derive(Debug, thiserror::Error)]
pub enum KeyMaterialError {
    /// The key-set document could not be read.
    #[error("cannot read key-set document: {0}")]
    Io(#[from] std::io::Error),
    /// The key-set document is not valid JSON of the expected shape.
    #[error("malformed key-set document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// No key with the required usage role is present in the document.
    #[error("no `{0}` key found in key-set document")]
    MissingRole(KeyUse),
    /// The key is not an EC key.
    #[error("unsupported key type `{0}`, only EC keys are supported")]
    UnsupportedKeyType(String),
    /// The key is on the wrong curve for its role.
    #[error("expected curve `{expected}`, got `{actual}`")]
    WrongCurve {
        /// The curve the role requires.
        expected: &'static str,
        /// The curve the document declares.
        actual: String,
    },
    /// A private-key operation was requested on a key without a `d` component.
    #[error("key has no private component")]
    MissingPrivateComponent,
    /// The key data itself is unusable (bad base64, wrong length, not on curve).
    #[error("invalid key data: {0}")]
    InvalidKey(String),
}

/// The usage role of a key inside a key set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUse {
    /// Signature creation/verification.
    #[serde(rename = "sig")]
    Signature,
    /// Encryption/decryption key agreement.
    #[serde(rename = "enc")]
    Encryption,
}

impl fmt::Display for KeyUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyUse::Signature => f.write_str("sig"),
            KeyUse::Encryption => f.write_str("enc"),
        }
    }
}

/// A single EC JWK.
///
/// Coordinates and the optional private scalar are base64url-encoded without
/// padding, as on the wire.
#[derive(Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type; only `EC` is supported.
    pub kty: String,
    /// Curve name (`P-384` for signature keys, `P-256` for encryption keys).
    pub crv: String,
    /// Usage role.
    #[serde(rename = "use")]
    pub key_use: KeyUse,
    /// Key identifier, embedded in token headers for key selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Declared algorithm, informational.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Affine x coordinate.
    pub x: String,
    /// Affine y coordinate.
    pub y: String,
    /// Private scalar; absent in public documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

// Debug by hand so a secret scalar never ends up in logs.
impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("crv", &self.crv)
            .field("use", &self.key_use)
            .field("kid", &self.kid)
            .field("d", &self.d.as_ref().map(|_| "omitted"))
            .finish()
    }
}

/// An ordered collection of keys, loaded once at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JwkSet {
    /// The keys in document order.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Reads a key-set document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, KeyMaterialError> {
        Ok(serde_json::from_reader(File::open(path)?)?)
    }

    /// Resolves the key for a usage role.
    ///
    /// The first key carrying the role wins; a document without one is a
    /// configuration error.
    pub fn key_for(&self, key_use: KeyUse) -> Result<&Jwk, KeyMaterialError> {
        self.keys
            .iter()
            .find(|k| k.key_use == key_use)
            .ok_or(KeyMaterialError::MissingRole(key_use))
    }
}

impl Jwk {
    fn require_ec(&self, expected_crv: &'static str) -> Result<(), KeyMaterialError> {
        if self.kty != "EC" {
            return Err(KeyMaterialError::UnsupportedKeyType(self.kty.clone()));
        }
        if self.crv != expected_crv {
            return Err(KeyMaterialError::WrongCurve {
                expected: expected_crv,
                actual: self.crv.clone(),
            });
        }
        Ok(())
    }

    fn private_scalar(&self, len: usize) -> Result<Vec<u8>, KeyMaterialError> {
        let d = self
            .d
            .as_deref()
            .ok_or(KeyMaterialError::MissingPrivateComponent)?;
        decode_component(d, len)
    }

    /// Builds the ES384 signing key from a P-384 private JWK.
    pub fn es384_signing_key(&self) -> Result<EncodingKey, KeyMaterialError> {
        self.require_ec("P-384")?;
        let d = self.private_scalar(48)?;
        let secret = p384::SecretKey::from_slice(&d)
            .map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))?;
        let pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))?;
        EncodingKey::from_ec_pem(pem.as_bytes())
            .map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))
    }

    /// Builds the ES384 verification key from a P-384 public JWK.
    pub fn es384_verifying_key(&self) -> Result<DecodingKey, KeyMaterialError> {
        self.require_ec("P-384")?;
        DecodingKey::from_ec_components(&self.x, &self.y)
            .map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))
    }

    /// Extracts the P-256 private key used for JWE key agreement.
    pub fn p256_secret_key(&self) -> Result<p256::SecretKey, KeyMaterialError> {
        self.require_ec("P-256")?;
        let d = self.private_scalar(32)?;
        p256::SecretKey::from_slice(&d).map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))
    }

    /// Extracts the P-256 public key a sender encrypts to.
    pub fn p256_public_key(&self) -> Result<p256::PublicKey, KeyMaterialError> {
        self.require_ec("P-256")?;
        let x = decode_component(&self.x, 32)?;
        let y = decode_component(&self.y, 32)?;
        let point = p256::EncodedPoint::from_affine_coordinates(
            p256::FieldBytes::from_slice(&x),
            p256::FieldBytes::from_slice(&y),
            false,
        );
        Option::from(p256::PublicKey::from_encoded_point(&point))
            .ok_or_else(|| KeyMaterialError::InvalidKey("point is not on P-256".to_string()))
    }

    /// Wraps a generated P-384 private key as a signature JWK.
    pub fn from_p384_secret(secret: &p384::SecretKey, kid: impl Into<String>) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        Self {
            kty: "EC".to_string(),
            crv: "P-384".to_string(),
            key_use: KeyUse::Signature,
            kid: Some(kid.into()),
            alg: Some("ES384".to_string()),
            x: encode_coordinate(point.x().map(|v| v.as_slice())),
            y: encode_coordinate(point.y().map(|v| v.as_slice())),
            d: Some(URL_SAFE_NO_PAD.encode(secret.to_bytes())),
        }
    }

    /// Wraps a P-384 public key as a signature JWK.
    pub fn from_p384_public(public: &p384::PublicKey, kid: impl Into<String>) -> Self {
        let point = public.to_encoded_point(false);
        Self {
            kty: "EC".to_string(),
            crv: "P-384".to_string(),
            key_use: KeyUse::Signature,
            kid: Some(kid.into()),
            alg: Some("ES384".to_string()),
            x: encode_coordinate(point.x().map(|v| v.as_slice())),
            y: encode_coordinate(point.y().map(|v| v.as_slice())),
            d: None,
        }
    }

    /// Wraps a generated P-256 private key as an encryption JWK.
    pub fn from_p256_secret(secret: &p256::SecretKey, kid: impl Into<String>) -> Self {
        let point = secret.public_key().to_encoded_point(false);
        Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            key_use: KeyUse::Encryption,
            kid: Some(kid.into()),
            alg: Some("ECDH-ES".to_string()),
            x: encode_coordinate(point.x().map(|v| v.as_slice())),
            y: encode_coordinate(point.y().map(|v| v.as_slice())),
            d: Some(URL_SAFE_NO_PAD.encode(secret.to_bytes())),
        }
    }

    /// Wraps a P-256 public key as an encryption JWK.
    pub fn from_p256_public(public: &p256::PublicKey, kid: impl Into<String>) -> Self {
        let point = public.to_encoded_point(false);
        Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            key_use: KeyUse::Encryption,
            kid: Some(kid.into()),
            alg: Some("ECDH-ES".to_string()),
            x: encode_coordinate(point.x().map(|v| v.as_slice())),
            y: encode_coordinate(point.y().map(|v| v.as_slice())),
            d: None,
        }
    }
}

fn encode_coordinate(coordinate: Option<&[u8]>) -> String {
    // the uncompressed SEC1 encoding always carries both coordinates
    URL_SAFE_NO_PAD.encode(coordinate.unwrap_or_default())
}

fn decode_component(value: &str, len: usize) -> Result<Vec<u8>, KeyMaterialError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| KeyMaterialError::InvalidKey(e.to_string()))?;
    if bytes.len() != len {
        return Err(KeyMaterialError::InvalidKey(format!(
            "expected {len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn sample_set() -> JwkSet {
        let sig = p384::SecretKey::random(&mut OsRng);
        let enc = p256::SecretKey::random(&mut OsRng);
        JwkSet {
            keys: vec![
                Jwk::from_p384_secret(&sig, "sig-1"),
                Jwk::from_p256_secret(&enc, "enc-1"),
            ],
        }
    }

    #[test]
    fn resolves_one_key_per_role() {
        let set = sample_set();
        assert_eq!(set.key_for(KeyUse::Signature).unwrap().crv, "P-384");
        assert_eq!(set.key_for(KeyUse::Encryption).unwrap().crv, "P-256");
    }

    #[test]
    fn missing_role_is_an_error() {
        let mut set = sample_set();
        set.keys.retain(|k| k.key_use != KeyUse::Encryption);
        assert!(matches!(
            set.key_for(KeyUse::Encryption),
            Err(KeyMaterialError::MissingRole(KeyUse::Encryption))
        ));
    }

    #[test]
    fn converts_generated_keys_back() {
        let set = sample_set();
        set.key_for(KeyUse::Signature)
            .unwrap()
            .es384_signing_key()
            .unwrap();
        set.key_for(KeyUse::Signature)
            .unwrap()
            .es384_verifying_key()
            .unwrap();
        let enc = set.key_for(KeyUse::Encryption).unwrap();
        let secret = enc.p256_secret_key().unwrap();
        let public = enc.p256_public_key().unwrap();
        assert_eq!(secret.public_key(), public);
    }

    #[test]
    fn public_jwk_has_no_private_component() {
        let enc = p256::SecretKey::random(&mut OsRng);
        let jwk = Jwk::from_p256_public(&enc.public_key(), "enc-1");
        assert!(matches!(
            jwk.p256_secret_key(),
            Err(KeyMaterialError::MissingPrivateComponent)
        ));
    }

    #[test]
    fn wrong_curve_is_rejected() {
        let set = sample_set();
        assert!(matches!(
            set.key_for(KeyUse::Encryption).unwrap().es384_signing_key(),
            Err(KeyMaterialError::WrongCurve { .. })
        ));
    }

    #[test]
    fn document_round_trips_through_json() {
        let set = sample_set();
        let json = serde_json::to_string(&set).unwrap();
        let parsed: JwkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.keys.len(), 2);
        assert_eq!(parsed.keys[0].key_use, KeyUse::Signature);
    }
}
