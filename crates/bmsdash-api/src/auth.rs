// Login / logout
//
// Login exchanges credentials for a token pair and caches the user profile
// in the session. Logout tells the backend (best effort) and clears every
// persisted key.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::{ApiClient, LOGIN_PATH, LOGOUT_PATH, handle_response, server_error};
use crate::error::Error;
use crate::session::SessionEvent;
use crate::token::TokenGrant;

/// What a successful login returned besides the tokens.
#[derive(Debug, Clone, Default)]
pub struct LoginOutcome {
    /// The `user` object from the login response, if any.
    pub profile: Option<Value>,
}

impl ApiClient {
    /// Authenticate with username/password.
    ///
    /// On success both tokens are stored, the logged-in flag is set and a
    /// [`SessionEvent::LoggedIn`] is emitted.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, Error> {
        let url = self.url(LOGIN_PATH)?;
        debug!("logging in at {url}");

        let body = json!({
            "username": username,
            "password": password.expose_secret(),
        });

        let resp = self
            .http()
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Error::from_send)?;

        let status = resp.status();
        if !status.is_success() {
            let err = server_error(status, resp).await;
            return Err(match err {
                Error::Server { status, body, .. } if status == 400 || status == 401 => {
                    Error::Authentication {
                        message: format!("login failed (HTTP {status}): {body}"),
                    }
                }
                other => other,
            });
        }

        let body: Value = handle_response(resp).await?;
        let pair = TokenGrant::from_body(&body)
            .and_then(|grant| grant.into_pair(None, Utc::now()))
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no token pair".into(),
            })?;

        let profile = login_profile(&body).cloned();

        self.tokens().set_tokens(pair)?;
        self.session().record_login(profile.as_ref())?;
        self.session().emit(SessionEvent::LoggedIn);

        info!(username, "login successful");
        Ok(LoginOutcome { profile })
    }

    /// End the session.
    ///
    /// The backend call is best effort: local credentials are cleared even
    /// if it fails, since the user asked to be logged out.
    pub async fn logout(&self) -> Result<(), Error> {
        if let Some(pair) = self.tokens().current() {
            let url = self.url(LOGOUT_PATH)?;
            debug!("logging out at {url}");

            let result = self
                .http()
                .post(url)
                .bearer_auth(pair.access_token.expose_secret())
                .json(&json!({ "refreshToken": pair.refresh_token.expose_secret() }))
                .send()
                .await;
            if let Err(e) = result {
                warn!(error = %e, "logout request failed, clearing local session anyway");
            }
        }

        self.tokens().clear()?;
        self.session().end()
    }
}

/// The user object may sit beside the tokens or inside the envelope's `data`.
fn login_profile(body: &Value) -> Option<&Value> {
    body.get("data")
        .and_then(|data| data.get("user"))
        .or_else(|| body.get("user"))
        .filter(|user| user.is_object())
}
