//! Test doubles for the client flow.

use idgate_client::wallet::{WalletDeriver, WalletError, WalletIdentity};
use idgate_types::claims::IdentityClaims;

/// Derives a deterministic wallet address from the account part of the
/// subject identifier.
pub struct StaticWalletDeriver;

#[async_trait::async_trait]
impl WalletDeriver for StaticWalletDeriver {
    async fn derive(
        &self,
        _id_token: &str,
        claims: &IdentityClaims,
    ) -> Result<WalletIdentity, WalletError> {
        let subject = claims
            .subject_id()
            .map_err(|err| WalletError::UnusableClaims(err.to_string()))?;
        Ok(WalletIdentity {
            address: format!("0x{}", subject.account_id.simple()),
        })
    }

    async fn disconnect(&self) {}
}
