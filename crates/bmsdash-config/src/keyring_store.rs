// OS keyring credential store
//
// One keyring entry per session key, named `<profile>/<key>` under the
// `bmsdash` service, so several profiles can stay logged in side by side.

use bmsdash_api::{CredentialStore, Error};
use tracing::trace;

use crate::KEYRING_SERVICE;

/// Session persistence backed by the platform secret service.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    profile: String,
}

impl KeyringStore {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, Error> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{}/{key}", self.profile))
            .map_err(|e| Error::Store(e.to_string()))
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        trace!(profile = %self.profile, key, "keyring set");
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Store(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        trace!(profile = %self.profile, key, "keyring remove");
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }
}
