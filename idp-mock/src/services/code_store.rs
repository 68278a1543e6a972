//! Single-use authorization codes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::distributions::Alphanumeric;
use rand::Rng as _;

const CODE_LEN: usize = 32;

/// What the authorize endpoint recorded for a code.
#[derive(Clone, Debug)]
pub(crate) struct IssuedCode {
    /// The nonce of the authorization request, bound into the token.
    pub(crate) nonce: Option<String>,
    /// The redirect URI the code was issued for. The token exchange must
    /// send the same bytes.
    pub(crate) redirect_uri: String,
}

/// In-memory store of outstanding authorization codes.
///
/// Redemption removes the entry, so a code can be exchanged at most once.
#[derive(Clone, Default)]
pub(crate) struct CodeStore {
    codes: Arc<Mutex<HashMap<String, IssuedCode>>>,
}

impl CodeStore {
    /// Mints a fresh code for an authorization request.
    pub(crate) fn issue(&self, issued: IssuedCode) -> String {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LEN)
            .map(char::from)
            .collect();
        self.codes
            .lock()
            .expect("Lock poisoned")
            .insert(code.clone(), issued);
        code
    }

    /// Redeems a code, consuming it.
    pub(crate) fn redeem(&self, code: &str) -> Option<IssuedCode> {
        self.codes.lock().expect("Lock poisoned").remove(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_single_use() {
        let store = CodeStore::default();
        let code = store.issue(IssuedCode {
            nonce: Some("n".to_string()),
            redirect_uri: "http://localhost:3000".to_string(),
        });
        assert!(store.redeem(&code).is_some());
        assert!(store.redeem(&code).is_none());
    }

    #[test]
    fn unknown_codes_do_not_redeem() {
        let store = CodeStore::default();
        assert!(store.redeem("never-issued").is_none());
    }
}
