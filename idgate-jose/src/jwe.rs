//! Compact JWE encryption for identity tokens.
//!
//! Exactly one scheme is supported: `alg=ECDH-ES` (direct key agreement on
//! P-256 with the one-step Concat-KDF over SHA-256) and `enc=A256GCM`. The
//! compact serialization has five dot-separated segments; the encrypted-key
//! segment is always empty because ECDH-ES derives the content key directly.
//!
//! Decryption failures are deliberately coarse: AES-GCM authenticates the
//! ciphertext, so a wrong key or a tampered token both surface as
//! [`JweError::Decryption`] and never as garbage plaintext.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand::rngs::OsRng;
use rand::RngCore as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The only supported key-agreement algorithm.
pub const JWE_ALG: &str = "ECDH-ES";
/// The only supported content-encryption algorithm.
pub const JWE_ENC: &str = "A256GCM";

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const CEK_BITS: u32 = 256;

/// Errors raised while encrypting or decrypting a compact JWE.
#[derive(Debug, thiserror::Error)]
pub enum JweError {
    /// The token is not a structurally valid compact JWE.
    #[error("malformed compact JWE: {0}")]
    Malformed(&'static str),
    /// The protected header declares an algorithm other than ECDH-ES.
    #[error("unsupported JWE algorithm `{0}`")]
    UnsupportedAlgorithm(String),
    /// The protected header declares a content encryption other than A256GCM.
    #[error("unsupported JWE encryption `{0}`")]
    UnsupportedEncryption(String),
    /// The ephemeral public key in the header is unusable.
    #[error("invalid ephemeral public key")]
    InvalidEphemeralKey,
    /// Authenticated decryption failed: wrong key or tampered token.
    #[error("decryption failed")]
    Decryption,
}

/// The protected header of a compact JWE.
#[derive(Debug, Serialize, Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    epk: EphemeralKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// The sender's ephemeral P-256 public key, embedded in the header.
#[derive(Debug, Serialize, Deserialize)]
struct EphemeralKey {
    kty: String,
    crv: String,
    x: String,
    y: String,
}

impl EphemeralKey {
    fn from_public_key(public: &p256::PublicKey) -> Result<Self, JweError> {
        let point = public.to_encoded_point(false);
        let x = point.x().ok_or(JweError::InvalidEphemeralKey)?;
        let y = point.y().ok_or(JweError::InvalidEphemeralKey)?;
        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        })
    }

    fn to_public_key(&self) -> Result<p256::PublicKey, JweError> {
        if self.kty != "EC" || self.crv != "P-256" {
            return Err(JweError::InvalidEphemeralKey);
        }
        let x = decode_coordinate(&self.x)?;
        let y = decode_coordinate(&self.y)?;
        let point = p256::EncodedPoint::from_affine_coordinates(
            p256::FieldBytes::from_slice(&x),
            p256::FieldBytes::from_slice(&y),
            false,
        );
        Option::from(p256::PublicKey::from_encoded_point(&point))
            .ok_or(JweError::InvalidEphemeralKey)
    }
}

fn decode_coordinate(value: &str) -> Result<Vec<u8>, JweError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| JweError::InvalidEphemeralKey)?;
    if bytes.len() != 32 {
        return Err(JweError::InvalidEphemeralKey);
    }
    Ok(bytes)
}

/// Encrypts `plaintext` to `recipient` as a compact JWE.
///
/// A fresh ephemeral key pair is generated per call; `kid` identifies the
/// recipient key so the receiving party can select it.
pub fn encrypt(
    plaintext: &[u8],
    recipient: &p256::PublicKey,
    kid: Option<&str>,
) -> Result<String, JweError> {
    let ephemeral = p256::ecdh::EphemeralSecret::random(&mut OsRng);
    let header = ProtectedHeader {
        alg: JWE_ALG.to_string(),
        enc: JWE_ENC.to_string(),
        epk: EphemeralKey::from_public_key(&ephemeral.public_key())?,
        kid: kid.map(str::to_string),
    };
    let header_json =
        serde_json::to_vec(&header).map_err(|_| JweError::Malformed("unencodable header"))?;
    let protected = URL_SAFE_NO_PAD.encode(header_json);

    let shared = ephemeral.diffie_hellman(recipient);
    let cek = concat_kdf_sha256(shared.raw_secret_bytes());
    let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| JweError::Decryption)?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    // The AAD of a compact JWE is the ASCII form of the protected segment.
    let mut sealed = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| JweError::Decryption)?;
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(format!(
        "{protected}..{}.{}.{}",
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(&sealed),
        URL_SAFE_NO_PAD.encode(&tag),
    ))
}

/// Decrypts a compact JWE with the recipient's private key.
///
/// Returns the plaintext bytes exactly as they were encrypted.
pub fn decrypt(compact: &str, recipient: &p256::SecretKey) -> Result<Vec<u8>, JweError> {
    let segments = compact.split('.').collect::<Vec<_>>();
    let &[protected, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
        return Err(JweError::Malformed("expected five segments"));
    };
    if !encrypted_key.is_empty() {
        // ECDH-ES derives the content key directly; a populated segment
        // means a key-wrapping scheme we do not speak.
        return Err(JweError::Malformed("unexpected encrypted key segment"));
    }

    let header_json = URL_SAFE_NO_PAD
        .decode(protected)
        .map_err(|_| JweError::Malformed("undecodable protected header"))?;
    let header: ProtectedHeader = serde_json::from_slice(&header_json)
        .map_err(|_| JweError::Malformed("unparsable protected header"))?;
    if header.alg != JWE_ALG {
        return Err(JweError::UnsupportedAlgorithm(header.alg));
    }
    if header.enc != JWE_ENC {
        return Err(JweError::UnsupportedEncryption(header.enc));
    }

    let epk = header.epk.to_public_key()?;
    let shared = p256::ecdh::diffie_hellman(recipient.to_nonzero_scalar(), epk.as_affine());
    let cek = concat_kdf_sha256(shared.raw_secret_bytes());
    let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| JweError::Decryption)?;

    let iv = URL_SAFE_NO_PAD
        .decode(iv)
        .map_err(|_| JweError::Malformed("undecodable iv"))?;
    if iv.len() != IV_LEN {
        return Err(JweError::Malformed("iv must be 96 bits"));
    }
    let mut sealed = URL_SAFE_NO_PAD
        .decode(ciphertext)
        .map_err(|_| JweError::Malformed("undecodable ciphertext"))?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| JweError::Malformed("undecodable tag"))?;
    if tag.len() != TAG_LEN {
        return Err(JweError::Malformed("tag must be 128 bits"));
    }
    sealed.extend_from_slice(&tag);

    cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: protected.as_bytes(),
            },
        )
        .map_err(|_| JweError::Decryption)
}

/// The one-step Concat-KDF of RFC 7518 §4.6 for a 256-bit content key.
///
/// OtherInfo is `AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo` with
/// empty party infos; a single SHA-256 round yields the full key.
fn concat_kdf_sha256(z: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(z);
    hasher.update((JWE_ENC.len() as u32).to_be_bytes());
    hasher.update(JWE_ENC.as_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(CEK_BITS.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_pair() -> (p256::SecretKey, p256::PublicKey) {
        let secret = p256::SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        (secret, public)
    }

    #[test]
    fn round_trip_is_byte_exact() {
        let (secret, public) = key_pair();
        let plaintext = br#"{"sub":"s=S1234567A,u=11111111-1111-1111-1111-111111111111"}"#;
        let token = encrypt(plaintext, &public, Some("enc-1")).unwrap();
        let decrypted = decrypt(&token, &secret).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn fresh_ephemeral_key_per_call() {
        let (_, public) = key_pair();
        let a = encrypt(b"same plaintext", &public, None).unwrap();
        let b = encrypt(b"same plaintext", &public, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_closed() {
        let (_, public) = key_pair();
        let (other_secret, _) = key_pair();
        let token = encrypt(b"secret claims", &public, None).unwrap();
        assert!(matches!(
            decrypt(&token, &other_secret),
            Err(JweError::Decryption)
        ));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let (secret, public) = key_pair();
        let token = encrypt(b"secret claims", &public, None).unwrap();
        let mut segments = token.split('.').map(str::to_string).collect::<Vec<_>>();
        // flip a bit inside the ciphertext segment
        let mut ct = URL_SAFE_NO_PAD.decode(&segments[3]).unwrap();
        ct[0] ^= 0x01;
        segments[3] = URL_SAFE_NO_PAD.encode(&ct);
        assert!(matches!(
            decrypt(&segments.join("."), &secret),
            Err(JweError::Decryption)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected_before_key_use() {
        let (secret, _) = key_pair();
        assert!(matches!(
            decrypt("only.three.segments", &secret),
            Err(JweError::Malformed(_))
        ));
        assert!(matches!(
            decrypt("a.key.c.d.e", &secret),
            Err(JweError::Malformed(_))
        ));
    }

    #[test]
    fn foreign_scheme_is_rejected() {
        let (secret, public) = key_pair();
        let token = encrypt(b"claims", &public, None).unwrap();
        let mut segments = token.split('.').map(str::to_string).collect::<Vec<_>>();
        let mut header: serde_json::Value = serde_json::from_slice(
            &URL_SAFE_NO_PAD.decode(&segments[0]).unwrap(),
        )
        .unwrap();
        header["enc"] = serde_json::json!("A128CBC-HS256");
        segments[0] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        assert!(matches!(
            decrypt(&segments.join("."), &secret),
            Err(JweError::UnsupportedEncryption(_))
        ));
    }
}
