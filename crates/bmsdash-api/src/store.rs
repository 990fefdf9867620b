// Credential persistence boundary
//
// A flat key-value store holding the token pair plus a few session flags.
// The in-memory implementation lives here; the OS keyring one lives in
// `bmsdash-config` so this crate stays free of platform secret services.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::Error;

/// Well-known keys written by the session and token store.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const TOKEN_EXPIRES_AT: &str = "tokenExpiresAt";
    pub const LOGGED_IN: &str = "isLoggedIn";
    pub const USER_PROFILE: &str = "userProfile";
    pub const ACTIVE_APPLICATION: &str = "activeApplication";

    /// Every key the session owns. `CredentialStore::clear` removes all of them.
    pub const ALL: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        TOKEN_EXPIRES_AT,
        LOGGED_IN,
        USER_PROFILE,
        ACTIVE_APPLICATION,
    ];
}

/// Key-value store for persisted session state.
///
/// Implementations must be safe to share across tasks; the session holds
/// one behind an `Arc`.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Remove every session key.
    fn clear(&self) -> Result<(), Error> {
        for key in keys::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-local store. Used by tests and one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
