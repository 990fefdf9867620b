// Authenticated HTTP client
//
// Every call fetches a valid bearer token from the token store, sends the
// request, and on HTTP 401 performs exactly one refresh followed by exactly
// one retry. Endpoint methods live in `auth.rs` and `telemetry.rs`.

use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::session::Session;
use crate::token::TokenStore;
use crate::transport::TransportConfig;

pub(crate) const LOGIN_PATH: &str = "auth/login";
pub(crate) const REFRESH_PATH: &str = "auth/refresh";
pub(crate) const LOGOUT_PATH: &str = "auth/logout";

/// Async client for the dashboard backend.
///
/// Holds the token store for one [`Session`]; share it behind an `Arc` when
/// several tasks issue calls concurrently.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: TokenStore,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    ///
    /// `base_url` is the API root, e.g. `https://bms.example.com/api`.
    pub fn new(
        base_url: &str,
        session: Arc<Session>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http, session)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        http: reqwest::Client,
        session: Arc<Session>,
    ) -> Result<Self, Error> {
        let base_url = normalize_base_url(base_url)?;
        let refresh_url = base_url.join(REFRESH_PATH)?;
        let tokens = TokenStore::new(session, http.clone(), refresh_url);
        Ok(Self {
            http,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn session(&self) -> &Arc<Session> {
        self.tokens.session()
    }

    /// The unauthenticated HTTP client (login uses it directly).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"electrical/machines"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Append `segments` to the base URL, percent-encoding each one so it
    /// stays a single path segment.
    ///
    /// Empty, `.` and `..` segments are rejected: they cannot address a
    /// resource below the base URL.
    pub(crate) fn segment_url<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url, Error> {
        if let Some(bad) = segments
            .iter()
            .map(S::as_ref)
            .find(|s| matches!(*s, "" | "." | ".."))
        {
            return Err(Error::Request {
                message: format!("invalid path segment {bad:?}"),
            });
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Request {
                message: format!("{} cannot be a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        self.get_url(url, params).await
    }

    pub(crate) async fn get_url<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {url} params={params:?}");

        let resp = self
            .execute(|http| http.get(url.clone()).query(params))
            .await?;
        handle_response(resp).await
    }

    // ── Auth pipeline ────────────────────────────────────────────────

    /// Send an authenticated request built by `build`, with the one-shot
    /// refresh-and-retry on 401.
    ///
    /// `build` is called once per attempt since a sent request cannot be
    /// replayed.
    async fn execute<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let (token, generation) = self.tokens.valid_token().await?;

        let resp = send(build(&self.http).bearer_auth(token.expose_secret())).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        warn!("request rejected with 401, refreshing access token");
        let token = self.tokens.refresh_from(generation).await?;

        debug!("retrying request with refreshed token");
        send(build(&self.http).bearer_auth(token.expose_secret())).await
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Ensure the base URL ends with `/` so relative joins append instead of
/// replacing the last segment.
fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    let path = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!("{path}/"));
    Ok(url)
}

async fn send(builder: RequestBuilder) -> Result<reqwest::Response, Error> {
    builder.send().await.map_err(Error::from_send)
}

/// Decode a success body or classify the failure.
pub(crate) async fn handle_response<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(server_error(status, resp).await);
    }

    let body = resp.text().await.map_err(Error::Network)?;
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

pub(crate) async fn server_error(status: StatusCode, resp: reqwest::Response) -> Error {
    let body = resp.text().await.unwrap_or_default();
    Error::Server {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://bms.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://bms.example.com/api/");

        let joined = url.join("electrical/machines").unwrap();
        assert_eq!(joined.as_str(), "https://bms.example.com/api/electrical/machines");
    }

    #[test]
    fn base_url_already_normalized() {
        let url = normalize_base_url("https://bms.example.com/api///").unwrap();
        assert_eq!(url.as_str(), "https://bms.example.com/api/");
    }

    fn client() -> ApiClient {
        ApiClient::with_client(
            "https://bms.example.com/api",
            reqwest::Client::new(),
            Arc::new(Session::in_memory()),
        )
        .unwrap()
    }

    #[test]
    fn segments_are_percent_encoded() {
        let url = client()
            .segment_url(&["electrical", "machines", "../../auth/x?y=1#", "trend"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bms.example.com/api/electrical/machines/..%2F..%2Fauth%2Fx%3Fy=1%23/trend"
        );
    }

    #[test]
    fn dot_segments_are_rejected() {
        let client = client();
        for bad in ["", ".", ".."] {
            let result = client.segment_url(&["electrical", "machines", bad, "logs"]);
            assert!(matches!(result, Err(Error::Request { .. })), "{bad:?}");
        }
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = ApiClient::with_client(
            "not a url",
            reqwest::Client::new(),
            Arc::new(Session::in_memory()),
        );
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
