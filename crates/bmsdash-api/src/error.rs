use thiserror::Error;

/// Top-level error type for the `bmsdash-api` crate.
///
/// The first five variants are the classes a dashboard has to tell apart when
/// choosing what to show the user; the rest cover configuration and decoding.
/// `bmsdash-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// No usable access token (never logged in, or the session was dropped).
    #[error("Not authenticated: {message}")]
    Authentication { message: String },

    /// The refresh endpoint rejected the refresh token or was unreachable.
    /// Stored credentials have already been cleared when this is returned.
    #[error("Token refresh failed: {message}")]
    Refresh { message: String },

    // ── HTTP ────────────────────────────────────────────────────────
    /// The backend answered with a non-success status.
    #[error("Server error (HTTP {status} {status_text})")]
    Server {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request went out but no response came back (connect failure,
    /// reset, timeout).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The request could not be built or handed to the transport.
    #[error("Request could not be sent: {message}")]
    Request { message: String },

    // ── Configuration ───────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The credential store could not be read or written.
    #[error("Credential store error: {0}")]
    Store(String),
}

impl Error {
    /// Classify a `reqwest` send failure.
    ///
    /// Builder errors never reached the wire; everything else means the
    /// request was dispatched without a usable response.
    pub(crate) fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Request {
                message: err.to_string(),
            }
        } else {
            Self::Network(err)
        }
    }

    /// Returns `true` if logging in again might resolve this error.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Refresh { .. } | Self::Server { status: 401, .. }
        )
    }

    /// HTTP status of a server rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short message suitable for an end user, one per failure class.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Authentication { .. } | Self::Refresh { .. } => {
                "You are not logged in. Please sign in again."
            }
            Self::Server { .. } | Self::Deserialization { .. } => {
                "The server rejected the request."
            }
            Self::Network(_) => "The network is unreachable. Check your connection.",
            Self::Request { .. } | Self::InvalidUrl(_) | Self::Tls(_) | Self::Store(_) => {
                "The request could not be made."
            }
        }
    }
}
