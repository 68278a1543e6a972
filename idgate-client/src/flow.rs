//! The client-side authentication flow.
//!
//! [`AuthFlow`] is a small state machine around the authorization redirect
//! and its callback. It owns the anti-forgery material, the at-most-once
//! callback latch and the persisted session, and drives wallet derivation
//! once a token is verified.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use idgate_types::claims::DecodedIdentityToken;
use rand::distributions::Alphanumeric;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::AuthFlowConfig;
use crate::gateway::GatewayClient;
use crate::storage::{
    StorageService, AUTH_STATE_KEY, ID_TOKEN_KEY, USER_KEY, WALLET_ADDRESS_KEY,
};
use crate::wallet::{WalletDeriverService, WalletError, WalletIdentity};

const STATE_LEN: usize = 32;

/// Where the flow currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthStage {
    /// No authentication in progress.
    Idle,
    /// An authorization URL has been handed out.
    Redirecting,
    /// Waiting for the provider to redirect back.
    AwaitingCallback,
    /// Checking the returned anti-forgery state.
    ValidatingState,
    /// Redeeming the authorization code at the gateway.
    ExchangingCode,
    /// Deriving the wallet identity from the verified token.
    DerivingIdentity,
    /// The session is established.
    Authenticated,
    /// The flow aborted; a new login is required.
    Failed(String),
}

/// Errors of the authentication flow.
#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    /// The callback handler already ran for this flow.
    #[error("callback already processed")]
    CallbackAlreadyProcessed,
    /// The returned state is missing or does not match the stored one.
    #[error("state mismatch, possible request forgery")]
    StateMismatch,
    /// The callback carried no authorization code.
    #[error("no authorization code in callback")]
    MissingCallbackCode,
    /// The gateway rejected the code.
    #[error("gateway rejected the authorization code ({status}): {message}")]
    Gateway {
        /// HTTP status of the gateway's answer.
        status: u16,
        /// Body of the gateway's answer.
        message: String,
    },
    /// The gateway could not be reached.
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    /// Wallet derivation failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),
    /// Stored session data could not be serialized or parsed.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// The configured endpoints do not form a valid URL.
    #[error(transparent)]
    InvalidRedirectUri(#[from] url::ParseError),
}

/// The anti-forgery material stored between redirect and callback.
#[derive(Debug, Serialize, Deserialize)]
struct StoredAuthState {
    state: String,
    nonce: String,
}

/// An established session.
#[derive(Clone, Debug)]
pub struct AuthSession {
    /// The signed identity token.
    pub id_token: String,
    /// The decoded and verified identity token.
    pub user: DecodedIdentityToken,
    /// The derived wallet identity.
    pub wallet: WalletIdentity,
}

/// The authentication flow state machine.
pub struct AuthFlow {
    config: AuthFlowConfig,
    gateway: GatewayClient,
    /// Short-lived per-tab storage for anti-forgery material.
    tab: StorageService,
    /// Durable storage for the session.
    durable: StorageService,
    wallet: WalletDeriverService,
    stage: Mutex<AuthStage>,
    callback_processed: AtomicBool,
}

impl AuthFlow {
    /// Creates an idle flow.
    pub fn new(
        config: AuthFlowConfig,
        tab: StorageService,
        durable: StorageService,
        wallet: WalletDeriverService,
    ) -> Self {
        let gateway = GatewayClient::new(reqwest::Client::new(), config.gateway_url.clone());
        Self {
            config,
            gateway,
            tab,
            durable,
            wallet,
            stage: Mutex::new(AuthStage::Idle),
            callback_processed: AtomicBool::new(false),
        }
    }

    /// The current stage.
    pub fn stage(&self) -> AuthStage {
        self.stage.lock().expect("Lock poisoned").clone()
    }

    fn set_stage(&self, stage: AuthStage) {
        *self.stage.lock().expect("Lock poisoned") = stage;
    }

    /// Begins a new login: stores fresh anti-forgery material and returns
    /// the authorization URL to redirect the browser to.
    ///
    /// Every call mints new state and nonce values and re-arms the callback
    /// latch, so an abandoned flow never leaks into the next one.
    pub fn login(&self) -> Result<Url, AuthFlowError> {
        self.set_stage(AuthStage::Redirecting);
        let state = random_token();
        let nonce = random_token();
        let stored = StoredAuthState {
            state: state.clone(),
            nonce: nonce.clone(),
        };
        self.tab
            .set(AUTH_STATE_KEY, &serde_json::to_string(&stored)?);
        self.callback_processed.store(false, Ordering::SeqCst);

        let mut url = Url::parse(&self.config.authorize_endpoint)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scope)
            .append_pair("nonce", &nonce)
            .append_pair("state", &state);

        self.set_stage(AuthStage::AwaitingCallback);
        tracing::debug!("authorization redirect prepared");
        Ok(url)
    }

    /// Handles the provider's redirect back.
    ///
    /// Runs at most once per login; a second invocation fails without
    /// touching stored state. The stored anti-forgery state is consumed
    /// unconditionally, so a mismatch also burns it.
    pub async fn handle_callback(
        &self,
        code: Option<&str>,
        state: Option<&str>,
    ) -> Result<AuthSession, AuthFlowError> {
        if self.callback_processed.swap(true, Ordering::SeqCst) {
            return Err(AuthFlowError::CallbackAlreadyProcessed);
        }

        self.set_stage(AuthStage::ValidatingState);
        let stored = self
            .tab
            .remove(AUTH_STATE_KEY)
            .and_then(|raw| serde_json::from_str::<StoredAuthState>(&raw).ok());
        let valid = match (&stored, state) {
            (Some(stored), Some(state)) => stored.state == state,
            _ => false,
        };
        if !valid {
            self.set_stage(AuthStage::Failed("possible request forgery".to_string()));
            return Err(AuthFlowError::StateMismatch);
        }

        let code = match code {
            Some(code) if !code.is_empty() => code,
            _ => {
                self.set_stage(AuthStage::Failed("no authorization code".to_string()));
                return Err(AuthFlowError::MissingCallbackCode);
            }
        };

        self.set_stage(AuthStage::ExchangingCode);
        let response = match self.gateway.redeem_code(code).await {
            Ok(response) => response,
            Err(err) => {
                self.set_stage(AuthStage::Failed(err.to_string()));
                return Err(err);
            }
        };
        self.durable.set(ID_TOKEN_KEY, &response.id_token);
        self.durable
            .set(USER_KEY, &serde_json::to_string(&response.user)?);

        self.set_stage(AuthStage::DerivingIdentity);
        let wallet = match self
            .wallet
            .derive(&response.id_token, &response.user.payload)
            .await
        {
            Ok(wallet) => wallet,
            Err(err) => {
                self.set_stage(AuthStage::Failed(err.to_string()));
                return Err(err.into());
            }
        };
        self.durable.set(WALLET_ADDRESS_KEY, &wallet.address);

        self.set_stage(AuthStage::Authenticated);
        tracing::debug!("session established");
        Ok(AuthSession {
            id_token: response.id_token,
            user: response.user,
            wallet,
        })
    }

    /// Read-only view of the stored session, if one is complete.
    ///
    /// Unlike [`restore`](Self::restore) this never talks to the wallet
    /// deriver and never changes the stage.
    pub fn session(&self) -> Result<Option<AuthSession>, AuthFlowError> {
        let (Some(id_token), Some(user_raw), Some(address)) = (
            self.durable.get(ID_TOKEN_KEY),
            self.durable.get(USER_KEY),
            self.durable.get(WALLET_ADDRESS_KEY),
        ) else {
            return Ok(None);
        };
        let user: DecodedIdentityToken = serde_json::from_str(&user_raw)?;
        Ok(Some(AuthSession {
            id_token,
            user,
            wallet: WalletIdentity { address },
        }))
    }

    /// Restores a session from durable storage, re-deriving the wallet.
    ///
    /// Returns `Ok(None)` when no complete session is stored.
    pub async fn restore(&self) -> Result<Option<AuthSession>, AuthFlowError> {
        let (Some(id_token), Some(user_raw)) =
            (self.durable.get(ID_TOKEN_KEY), self.durable.get(USER_KEY))
        else {
            return Ok(None);
        };
        let user: DecodedIdentityToken = serde_json::from_str(&user_raw)?;
        let wallet = self.wallet.derive(&id_token, &user.payload).await?;
        self.durable.set(WALLET_ADDRESS_KEY, &wallet.address);
        self.set_stage(AuthStage::Authenticated);
        Ok(Some(AuthSession {
            id_token,
            user,
            wallet,
        }))
    }

    /// Ends the session: clears stored data and disconnects the wallet.
    pub async fn logout(&self) {
        self.durable.clear();
        self.tab.clear();
        self.wallet.disconnect().await;
        self.set_stage(AuthStage::Idle);
        tracing::debug!("session cleared");
    }

    /// Returns a failed or abandoned flow to idle so a new login can start.
    ///
    /// Re-arms the callback latch and drops pending anti-forgery material;
    /// the stored session is left alone.
    pub fn reset(&self) {
        self.tab.clear();
        self.callback_processed.store(false, Ordering::SeqCst);
        self.set_stage(AuthStage::Idle);
    }
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::wallet::WalletDeriver;
    use idgate_types::claims::IdentityClaims;
    use std::sync::Arc;

    struct StaticWallet;

    #[async_trait::async_trait]
    impl WalletDeriver for StaticWallet {
        async fn derive(
            &self,
            _id_token: &str,
            _claims: &IdentityClaims,
        ) -> Result<WalletIdentity, WalletError> {
            Ok(WalletIdentity {
                address: "0xtest".to_string(),
            })
        }

        async fn disconnect(&self) {}
    }

    fn flow() -> AuthFlow {
        AuthFlow::new(
            AuthFlowConfig::default(),
            Arc::new(MemoryStorage::default()),
            Arc::new(MemoryStorage::default()),
            Arc::new(StaticWallet),
        )
    }

    fn stored_state(flow: &AuthFlow) -> StoredAuthState {
        serde_json::from_str(&flow.tab.get(AUTH_STATE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn login_mints_fresh_state_and_nonce() {
        let flow = flow();
        flow.login().unwrap();
        let first = stored_state(&flow);
        flow.login().unwrap();
        let second = stored_state(&flow);
        assert_ne!(first.state, second.state);
        assert_ne!(first.nonce, second.nonce);
        assert_eq!(first.state.len(), STATE_LEN);
        assert_eq!(flow.stage(), AuthStage::AwaitingCallback);
    }

    #[test]
    fn authorize_url_carries_the_stored_state() {
        let flow = flow();
        let url = flow.login().unwrap();
        let stored = stored_state(&flow);
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("state".to_string(), stored.state)));
        assert!(pairs.contains(&("nonce".to_string(), stored.nonce)));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid".to_string())));
    }

    #[tokio::test]
    async fn state_mismatch_aborts_and_burns_the_stored_state() {
        let flow = flow();
        flow.login().unwrap();
        let err = flow
            .handle_callback(Some("code"), Some("not-the-stored-state"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFlowError::StateMismatch));
        assert!(matches!(flow.stage(), AuthStage::Failed(_)));
        // the stored state is consumed even on mismatch
        assert_eq!(flow.tab.get(AUTH_STATE_KEY), None);
    }

    #[tokio::test]
    async fn missing_stored_state_aborts() {
        let flow = flow();
        let err = flow
            .handle_callback(Some("code"), Some("anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFlowError::StateMismatch));
    }

    #[tokio::test]
    async fn second_callback_is_rejected_by_the_latch() {
        let flow = flow();
        flow.login().unwrap();
        let _ = flow.handle_callback(Some("code"), Some("wrong")).await;
        let err = flow
            .handle_callback(Some("code"), Some("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFlowError::CallbackAlreadyProcessed));
    }

    #[tokio::test]
    async fn missing_code_aborts_after_state_validation() {
        let flow = flow();
        flow.login().unwrap();
        let state = stored_state(&flow).state;
        let err = flow
            .handle_callback(None, Some(&state))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthFlowError::MissingCallbackCode));
    }

    #[tokio::test]
    async fn login_rearms_the_latch() {
        let flow = flow();
        flow.login().unwrap();
        let _ = flow.handle_callback(Some("code"), Some("wrong")).await;
        flow.login().unwrap();
        let state = stored_state(&flow).state;
        // the latch is re-armed, so this attempt gets past it and fails on
        // the unreachable gateway instead
        let err = flow
            .handle_callback(Some("code"), Some(&state))
            .await
            .unwrap_err();
        assert!(!matches!(err, AuthFlowError::CallbackAlreadyProcessed));
    }

    #[tokio::test]
    async fn restore_without_session_is_none() {
        let flow = flow();
        assert!(flow.restore().await.unwrap().is_none());
        assert!(flow.session().unwrap().is_none());
        assert_eq!(flow.stage(), AuthStage::Idle);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let flow = flow();
        flow.login().unwrap();
        let _ = flow.handle_callback(None, None).await;
        flow.reset();
        assert_eq!(flow.stage(), AuthStage::Idle);
        assert_eq!(flow.tab.get(AUTH_STATE_KEY), None);
    }
}
