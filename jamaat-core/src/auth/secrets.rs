//! Secure storage for session tokens.
//!
//! The access and refresh tokens live in the platform credential store
//! (Keychain, Keystore, Secret Service, Credential Manager) through
//! `keyring-core`. The host registers the native store with
//! `keyring_core::set_default_store` before the core is opened. Only
//! non-secret session metadata goes into the local database.

use super::error::{AuthError, AuthResult};

/// Keyring service name the app's credentials are filed under.
pub const KEYRING_SERVICE: &str = "app.jamaat";

/// Entry holding the serialized session tokens.
pub const SESSION_TOKENS_KEY: &str = "session-tokens";

/// A small key-value store for secrets.
pub trait SecretStore: Send + Sync {
    /// Reads the secret under `key`, `None` when absent.
    ///
    /// # Errors
    ///
    /// The backing store is unavailable.
    fn get(&self, key: &str) -> AuthResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// The backing store is unavailable or rejects the value.
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// The backing store is unavailable.
    fn delete(&self, key: &str) -> AuthResult<()>;
}

/// [`SecretStore`] over the process-wide default `keyring-core` store.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    /// Files entries under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> AuthResult<keyring_core::Entry> {
        keyring_core::Entry::new(&self.service, key).map_err(keyring_error)
    }
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

fn keyring_error(err: keyring_core::Error) -> AuthError {
    AuthError::SecureStorage(err.to_string())
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring_core::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entry(key)?.set_password(value).map_err(keyring_error)
    }

    fn delete(&self, key: &str) -> AuthResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring_core::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

/// In-process [`SecretStore`] for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MemorySecretStore {
    fn values(
        &self,
    ) -> AuthResult<std::sync::MutexGuard<'_, std::collections::HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| AuthError::SecureStorage(format!("Secret store lock poisoned: {e}")))
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> AuthResult<()> {
        self.values()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_replaces_and_deletes() {
        let store = MemorySecretStore::default();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));

        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
