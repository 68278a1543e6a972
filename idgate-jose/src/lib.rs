#![deny(missing_docs, clippy::unwrap_used)]
//! JOSE primitives for the idgate authentication gateway.
//!
//! This crate provides the two cryptographic building blocks of the gateway
//! protocol:
//!
//! * [`jwk`] – JWK key-set documents with usage-role resolution and
//!   conversion into signing, verification, and key-agreement keys. The
//!   single supported signing algorithm is ES384 (ECDSA/P-384/SHA-384).
//! * [`jwe`] – the single supported encryption scheme: compact JWE with
//!   `alg=ECDH-ES` (direct key agreement on P-256, Concat-KDF/SHA-256) and
//!   `enc=A256GCM`.
//!
//! Key material is loaded once at process start and treated as immutable;
//! every resolution failure is surfaced as a typed error so callers can
//! fail fast instead of serving traffic with a misconfigured key set.

pub mod jwe;
pub mod jwk;

pub use jwe::JweError;
pub use jwk::{Jwk, JwkSet, KeyMaterialError, KeyUse};
