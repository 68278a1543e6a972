//! Wallet identity derivation.
//!
//! After a successful callback the flow derives a wallet identity from the
//! verified identity token. How that derivation works is platform-specific,
//! so it sits behind the [`WalletDeriver`] trait.

use std::sync::Arc;

use idgate_types::claims::IdentityClaims;

/// The derived wallet identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletIdentity {
    /// The wallet address.
    pub address: String,
}

/// Errors raised during wallet derivation.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// The verified claims are unusable for derivation.
    #[error("cannot derive wallet from identity claims: {0}")]
    UnusableClaims(String),
    /// The underlying wallet backend failed.
    #[error("wallet backend failure: {0}")]
    Backend(String),
}

/// Derives and disconnects wallet identities.
#[async_trait::async_trait]
pub trait WalletDeriver: Send + Sync {
    /// Derives the wallet identity for a verified token.
    async fn derive(
        &self,
        id_token: &str,
        claims: &IdentityClaims,
    ) -> Result<WalletIdentity, WalletError>;

    /// Tears down any wallet connection on logout.
    async fn disconnect(&self);
}

/// A shared wallet deriver handle.
pub type WalletDeriverService = Arc<dyn WalletDeriver>;
