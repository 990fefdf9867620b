// ── Core error types ──
//
// User-facing errors from bmsdash-core. Consumers see one variant per thing
// the user can act on; raw reqwest / serde errors stay behind the
// `From<bmsdash_api::Error>` impl.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Not logged in: {message}")]
    NotAuthenticated { message: String },

    #[error("Session expired: {message}")]
    SessionExpired { message: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Server rejected the request (HTTP {status} {status_text})")]
    ServerRejected {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Cannot reach backend at {url}: {reason}")]
    NetworkUnreachable { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Request could not be made: {message}")]
    RequestFailed { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the user has to log in (again) to continue.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated { .. }
                | Self::SessionExpired { .. }
                | Self::ServerRejected { status: 401, .. }
        )
    }

    /// One message per failure class, for rendering to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated { .. } | Self::SessionExpired { .. } => {
                "You are not logged in."
            }
            Self::ServerRejected { .. } => "The server rejected the request.",
            Self::NetworkUnreachable { .. } | Self::Timeout => "The network is unreachable.",
            Self::RequestFailed { .. } | Self::Config { .. } | Self::Internal(_) => {
                "The request could not be made."
            }
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<bmsdash_api::Error> for CoreError {
    fn from(err: bmsdash_api::Error) -> Self {
        use bmsdash_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::NotAuthenticated { message },
            Api::Refresh { message } => CoreError::SessionExpired { message },
            Api::Server {
                status,
                status_text,
                body,
            } => CoreError::ServerRejected {
                status,
                status_text,
                body,
            },
            Api::Network(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else {
                    CoreError::NetworkUnreachable {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                }
            }
            Api::Request { message } => CoreError::RequestFailed { message },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Api::Store(msg) => CoreError::Internal(format!("Credential store error: {msg}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_failure_maps_to_session_expired() {
        let err: CoreError = bmsdash_api::Error::Refresh {
            message: "HTTP 403".into(),
        }
        .into();
        assert!(matches!(err, CoreError::SessionExpired { .. }));
        assert!(err.needs_login());
    }

    #[test]
    fn server_error_keeps_status() {
        let err: CoreError = bmsdash_api::Error::Server {
            status: 502,
            status_text: "Bad Gateway".into(),
            body: String::new(),
        }
        .into();
        assert!(matches!(err, CoreError::ServerRejected { status: 502, .. }));
        assert!(!err.needs_login());
        assert_eq!(err.user_message(), "The server rejected the request.");
    }
}
