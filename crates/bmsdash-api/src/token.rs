// Token store
//
// Holds the current access/refresh pair in memory, mirrors it into the
// session's credential store, and performs refreshes. Refreshes are
// serialized: concurrent callers that saw the same token generation share a
// single backend round-trip instead of racing each other.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::session::{Session, SessionEvent};
use crate::store::keys;

/// Tokens expiring within this margin are refreshed ahead of time.
const EXPIRY_SKEW_SECS: i64 = 30;

// ── TokenPair ────────────────────────────────────────────────────────

/// Access token plus the refresh token used to renew it.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// `None` when the backend did not say; such tokens are trusted until a 401.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the access token should be considered expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ── Grant parsing ────────────────────────────────────────────────────

/// Token fields returned by the login and refresh endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenGrant {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl TokenGrant {
    /// Extract a grant from either `{success, data: {accessToken, ...}}` or a
    /// flat `{accessToken, ...}` body, in that order.
    pub(crate) fn from_body(body: &Value) -> Option<Self> {
        let enveloped = body
            .get("data")
            .filter(|_| body.get("success").and_then(Value::as_bool) == Some(true));
        enveloped
            .and_then(|data| serde_json::from_value(data.clone()).ok())
            .or_else(|| serde_json::from_value(body.clone()).ok())
    }

    /// Turn the grant into a pair, keeping `previous_refresh` when the backend
    /// did not rotate the refresh token.
    pub(crate) fn into_pair(
        self,
        previous_refresh: Option<&SecretString>,
        now: DateTime<Utc>,
    ) -> Option<TokenPair> {
        let refresh_token = match self.refresh_token {
            Some(token) => SecretString::from(token),
            None => previous_refresh?.clone(),
        };
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));
        Some(TokenPair {
            access_token: SecretString::from(self.access_token),
            refresh_token,
            expires_at,
        })
    }
}

// ── TokenStore ───────────────────────────────────────────────────────

#[derive(Default)]
struct TokenState {
    pair: Option<TokenPair>,
    /// Bumped on every replacement or clear. Lets a waiting refresher see that
    /// someone else already did the work.
    generation: u64,
}

/// Owner of the current token pair.
pub struct TokenStore {
    session: Arc<Session>,
    http: reqwest::Client,
    refresh_url: Url,
    state: RwLock<TokenState>,
    refresh_gate: Mutex<()>,
}

impl TokenStore {
    /// Create a store, restoring any pair persisted in the session's
    /// credential store.
    pub fn new(session: Arc<Session>, http: reqwest::Client, refresh_url: Url) -> Self {
        let pair = load_persisted(&session);
        if pair.is_some() {
            debug!("restored persisted token pair");
        }
        Self {
            session,
            http,
            refresh_url,
            state: RwLock::new(TokenState {
                pair,
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Snapshot of the current pair.
    pub fn current(&self) -> Option<TokenPair> {
        self.read_state().pair.clone()
    }

    /// Install a new pair (after login) and persist it.
    pub fn set_tokens(&self, pair: TokenPair) -> Result<(), Error> {
        persist(&self.session, &pair)?;
        let mut state = self.write_state();
        state.pair = Some(pair);
        state.generation += 1;
        Ok(())
    }

    /// Drop the in-memory pair and every persisted key.
    pub fn clear(&self) -> Result<(), Error> {
        {
            let mut state = self.write_state();
            state.pair = None;
            state.generation += 1;
        }
        self.session.store().clear()
    }

    /// Return a usable access token, refreshing first if the current one is
    /// missing or expired.
    ///
    /// Fails with [`Error::Authentication`] when no token can be obtained.
    pub async fn get_valid_access_token(&self) -> Result<SecretString, Error> {
        self.valid_token().await.map(|(token, _)| token)
    }

    /// Force a refresh against the backend.
    ///
    /// On failure every stored credential is cleared, a
    /// [`SessionEvent::Invalidated`] is emitted, and [`Error::Refresh`] is
    /// returned.
    ///
    /// With no stored pair there is nothing to refresh: no request is sent,
    /// no event is emitted, and [`Error::Authentication`] is returned.
    pub async fn refresh_access_token(&self) -> Result<SecretString, Error> {
        let seen = self.read_state().generation;
        self.refresh_from(seen).await
    }

    /// Token plus the generation it belongs to.
    pub(crate) async fn valid_token(&self) -> Result<(SecretString, u64), Error> {
        let seen = {
            let state = self.read_state();
            match &state.pair {
                Some(pair) if !pair.is_expired_at(Utc::now()) => {
                    return Ok((pair.access_token.clone(), state.generation));
                }
                Some(_) => state.generation,
                None => {
                    return Err(Error::Authentication {
                        message: "no access token; log in first".into(),
                    });
                }
            }
        };

        debug!("access token expired, refreshing");
        match self.refresh_from(seen).await {
            Ok(token) => Ok((token, self.read_state().generation)),
            Err(Error::Refresh { message }) => Err(Error::Authentication {
                message: format!("session expired: {message}"),
            }),
            Err(e) => Err(e),
        }
    }

    /// Refresh unless the pair has already moved past generation `seen`.
    pub(crate) async fn refresh_from(&self, seen: u64) -> Result<SecretString, Error> {
        let _gate = self.refresh_gate.lock().await;

        let refresh_token = {
            let state = self.read_state();
            if state.generation != seen {
                debug!("token replaced while waiting, reusing it");
                return state
                    .pair
                    .as_ref()
                    .map(|pair| pair.access_token.clone())
                    .ok_or_else(|| Error::Authentication {
                        message: "session was cleared".into(),
                    });
            }
            match &state.pair {
                Some(pair) => pair.refresh_token.clone(),
                None => {
                    return Err(Error::Authentication {
                        message: "no refresh token available".into(),
                    });
                }
            }
        };

        match self.request_refresh(&refresh_token).await {
            Ok(pair) => {
                let token = pair.access_token.clone();
                if let Err(e) = persist(&self.session, &pair) {
                    warn!(error = %e, "failed to persist refreshed tokens");
                }
                {
                    let mut state = self.write_state();
                    state.pair = Some(pair);
                    state.generation += 1;
                }
                info!("access token refreshed");
                self.session.emit(SessionEvent::Refreshed);
                Ok(token)
            }
            Err(message) => {
                {
                    let mut state = self.write_state();
                    state.pair = None;
                    state.generation += 1;
                }
                self.session.invalidate(&message);
                Err(Error::Refresh { message })
            }
        }
    }

    /// One POST to the refresh endpoint. Errors are flattened to a message
    /// since every failure here ends the session the same way.
    async fn request_refresh(&self, refresh_token: &SecretString) -> Result<TokenPair, String> {
        debug!("POST {}", self.refresh_url);

        let resp = self
            .http
            .post(self.refresh_url.clone())
            .json(&json!({ "refreshToken": refresh_token.expose_secret() }))
            .send()
            .await
            .map_err(|e| format!("refresh endpoint unreachable: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("refresh rejected (HTTP {status})"));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| format!("unreadable refresh response: {e}"))?;

        TokenGrant::from_body(&body)
            .and_then(|grant| grant.into_pair(Some(refresh_token), Utc::now()))
            .ok_or_else(|| "refresh response carried no access token".to_owned())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("refresh_url", &self.refresh_url.as_str())
            .field("has_token", &self.read_state().pair.is_some())
            .finish_non_exhaustive()
    }
}

// ── Persistence ──────────────────────────────────────────────────────

fn persist(session: &Session, pair: &TokenPair) -> Result<(), Error> {
    let store = session.store();
    store.set(keys::ACCESS_TOKEN, pair.access_token.expose_secret())?;
    store.set(keys::REFRESH_TOKEN, pair.refresh_token.expose_secret())?;
    match pair.expires_at {
        Some(at) => store.set(keys::TOKEN_EXPIRES_AT, &at.to_rfc3339())?,
        None => store.remove(keys::TOKEN_EXPIRES_AT)?,
    }
    Ok(())
}

fn load_persisted(session: &Session) -> Option<TokenPair> {
    let store = session.store();
    let access = store.get(keys::ACCESS_TOKEN).ok()??;
    let refresh = store.get(keys::REFRESH_TOKEN).ok()??;
    let expires_at = store
        .get(keys::TOKEN_EXPIRES_AT)
        .ok()
        .flatten()
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|at| at.with_timezone(&Utc));
    Some(TokenPair {
        access_token: SecretString::from(access),
        refresh_token: SecretString::from(refresh),
        expires_at,
    })
}
