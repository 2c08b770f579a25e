//! Registers the platform credential store with `keyring-core`.
//!
//! `jamaat-core` keeps session tokens in whatever store is registered as
//! the process default; this picks the native one for the build target.

use std::sync::{Arc, Once};

static REGISTER: Once = Once::new();

/// Installs the native credential store once per process.
pub(crate) fn register_native_store() {
    REGISTER.call_once(|| match native_store() {
        Ok(Some(store)) => keyring_core::set_default_store(store),
        Ok(None) => log::warn!("No native credential store for this platform"),
        Err(e) => log::warn!("Native credential store unavailable: {e}"),
    });
}

#[cfg(target_os = "macos")]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    let store: Arc<keyring_core::CredentialStore> = apple_native_keyring_store::keychain::Store::new()?;
    Ok(Some(store))
}

#[cfg(target_os = "ios")]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    let store: Arc<keyring_core::CredentialStore> = apple_native_keyring_store::protected::Store::new()?;
    Ok(Some(store))
}

#[cfg(target_os = "linux")]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    let store: Arc<keyring_core::CredentialStore> = zbus_secret_service_keyring_store::Store::new()?;
    Ok(Some(store))
}

#[cfg(target_os = "windows")]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    let store: Arc<keyring_core::CredentialStore> = windows_native_keyring_store::Store::new()?;
    Ok(Some(store))
}

#[cfg(target_os = "android")]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    let store: Arc<keyring_core::CredentialStore> = android_native_keyring_store::Store::new()?;
    Ok(Some(store))
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "linux",
    target_os = "windows",
    target_os = "android"
)))]
#[allow(clippy::unnecessary_wraps)]
fn native_store() -> Result<Option<Arc<keyring_core::CredentialStore>>, keyring_core::Error> {
    Ok(None)
}
