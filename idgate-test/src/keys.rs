//! Key-set generation for tests.
//!
//! Generates fresh key pairs per test run and writes the four key-set
//! documents the gateway and the mock provider load at startup.

use std::path::{Path, PathBuf};

use idgate_jose::Jwk;
use rand::rngs::OsRng;

/// The generated key-set documents, living inside a tempdir.
pub struct KeyFiles {
    /// Relying party secret set: `sig` and `enc` private keys.
    pub rp_secret: PathBuf,
    /// Relying party public set: `sig` and `enc` public keys.
    pub rp_public: PathBuf,
    /// Provider secret set: `sig` private key.
    pub provider_secret: PathBuf,
    /// Provider public set: `sig` public key.
    pub provider_public: PathBuf,
    _dir: tempfile::TempDir,
}

fn write_set(dir: &Path, name: &str, keys: Vec<Jwk>) -> eyre::Result<PathBuf> {
    let path = dir.join(name);
    let doc = serde_json::json!({ "keys": keys });
    std::fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
    Ok(path)
}

/// Generates all key pairs and writes the four documents.
pub fn generate_key_files() -> eyre::Result<KeyFiles> {
    let dir = tempfile::tempdir()?;

    let rp_sig = p384::SecretKey::random(&mut OsRng);
    let rp_enc = p256::SecretKey::random(&mut OsRng);
    let provider_sig = p384::SecretKey::random(&mut OsRng);

    let rp_secret = write_set(
        dir.path(),
        "rp-secret.json",
        vec![
            Jwk::from_p384_secret(&rp_sig, "sig-1"),
            Jwk::from_p256_secret(&rp_enc, "enc-1"),
        ],
    )?;
    let rp_public = write_set(
        dir.path(),
        "rp-public.json",
        vec![
            Jwk::from_p384_public(&rp_sig.public_key(), "sig-1"),
            Jwk::from_p256_public(&rp_enc.public_key(), "enc-1"),
        ],
    )?;
    let provider_secret = write_set(
        dir.path(),
        "provider-secret.json",
        vec![Jwk::from_p384_secret(&provider_sig, "idp-sig-1")],
    )?;
    let provider_public = write_set(
        dir.path(),
        "provider-public.json",
        vec![Jwk::from_p384_public(&provider_sig.public_key(), "idp-sig-1")],
    )?;

    Ok(KeyFiles {
        rp_secret,
        rp_public,
        provider_secret,
        provider_public,
        _dir: dir,
    })
}
