//! Key-value storage behind the authentication flow.
//!
//! The flow distinguishes two scopes: a per-tab store for short-lived
//! anti-forgery material and a durable store for the session itself. Both
//! are abstracted behind [`KeyValueStorage`] so callers can plug in whatever
//! their platform offers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Storage key of the signed identity token.
pub const ID_TOKEN_KEY: &str = "id_token";
/// Storage key of the decoded user JSON.
pub const USER_KEY: &str = "user";
/// Storage key of the pending anti-forgery material.
pub const AUTH_STATE_KEY: &str = "authState";
/// Storage key of the derived wallet address.
pub const WALLET_ADDRESS_KEY: &str = "wallet_address";

/// A string key-value store.
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);
    /// Removes a value, returning it if it was present.
    fn remove(&self, key: &str) -> Option<String>;
    /// Removes everything.
    fn clear(&self);
}

/// A shared storage handle.
pub type StorageService = Arc<dyn KeyValueStorage>;

/// In-memory storage, the default for tests and headless use.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("Lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("Lock poisoned")
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("Lock poisoned").remove(key)
    }

    fn clear(&self) {
        self.entries.lock().expect("Lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_consumes_the_value() {
        let storage = MemoryStorage::default();
        storage.set(AUTH_STATE_KEY, "abc");
        assert_eq!(storage.remove(AUTH_STATE_KEY).as_deref(), Some("abc"));
        assert_eq!(storage.remove(AUTH_STATE_KEY), None);
    }

    #[test]
    fn clear_empties_the_store() {
        let storage = MemoryStorage::default();
        storage.set(ID_TOKEN_KEY, "a");
        storage.set(USER_KEY, "b");
        storage.clear();
        assert_eq!(storage.get(ID_TOKEN_KEY), None);
        assert_eq!(storage.get(USER_KEY), None);
    }
}
