// Session state shared by the token store and the authenticated client.
//
// One `Session` per logged-in user. It owns the credential store handle and
// the broadcast channel that tells the host application about login, refresh
// and invalidation, so nothing in this crate needs to know about navigation.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::store::{CredentialStore, MemoryStore, keys};

const EVENT_CHANNEL_SIZE: usize = 16;

/// Lifecycle notifications emitted by a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login succeeded and tokens were stored.
    LoggedIn,
    /// The access token was replaced by a refresh.
    Refreshed,
    /// The user logged out explicitly.
    LoggedOut,
    /// Refresh failed irrecoverably; credentials were cleared and the host
    /// should send the user back to its login entry point.
    Invalidated { reason: String },
}

/// Explicit session context handed to [`TokenStore`](crate::TokenStore) and
/// [`ApiClient`](crate::ApiClient).
pub struct Session {
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { store, events }
    }

    /// A session backed by a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        debug!(?event, "session event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ── Auxiliary session keys ───────────────────────────────────────

    pub fn is_logged_in(&self) -> bool {
        matches!(self.store.get(keys::LOGGED_IN), Ok(Some(ref v)) if v == "true")
    }

    /// The user profile cached at login, if the backend returned one.
    pub fn profile(&self) -> Result<Option<serde_json::Value>, Error> {
        let Some(raw) = self.store.get(keys::USER_PROFILE)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    /// The application selector persisted by the host (which dashboard the
    /// user last opened).
    pub fn active_application(&self) -> Result<Option<String>, Error> {
        self.store.get(keys::ACTIVE_APPLICATION)
    }

    pub fn set_active_application(&self, name: &str) -> Result<(), Error> {
        self.store.set(keys::ACTIVE_APPLICATION, name)
    }

    pub(crate) fn record_login(&self, profile: Option<&serde_json::Value>) -> Result<(), Error> {
        self.store.set(keys::LOGGED_IN, "true")?;
        match profile {
            Some(profile) => self.store.set(keys::USER_PROFILE, &profile.to_string())?,
            None => self.store.remove(keys::USER_PROFILE)?,
        }
        Ok(())
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Clear everything after an explicit logout.
    pub(crate) fn end(&self) -> Result<(), Error> {
        self.store.clear()?;
        info!("session ended");
        self.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Clear everything after an unrecoverable auth failure and tell the host.
    pub(crate) fn invalidate(&self, reason: &str) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear credential store during invalidation");
        }
        warn!(reason, "session invalidated");
        self.emit(SessionEvent::Invalidated {
            reason: reason.to_owned(),
        });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_records_flag_and_profile() {
        let session = Session::in_memory();
        assert!(!session.is_logged_in());

        session
            .record_login(Some(&json!({ "name": "Facility Ops" })))
            .unwrap();

        assert!(session.is_logged_in());
        assert_eq!(
            session.profile().unwrap(),
            Some(json!({ "name": "Facility Ops" }))
        );
    }

    #[tokio::test]
    async fn invalidate_clears_store_and_emits_once() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store.clone());
        session.set_active_application("energy").unwrap();
        session.record_login(None).unwrap();

        let mut rx = session.subscribe();
        session.invalidate("refresh rejected");

        assert!(store.is_empty());
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Invalidated {
                reason: "refresh rejected".into()
            }
        );
        assert!(rx.try_recv().is_err());
    }
}
