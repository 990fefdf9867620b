//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use bmsdash_config::ConfigError;
use bmsdash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const SERVER: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Session ──────────────────────────────────────────────────────
    #[error("Not logged in: {reason}")]
    #[diagnostic(
        code(bmsdash::not_logged_in),
        help("Run: bmsdash login --profile {profile}")
    )]
    NotLoggedIn { profile: String, reason: String },

    #[error("Session expired: {reason}")]
    #[diagnostic(
        code(bmsdash::session_expired),
        help(
            "The backend no longer accepts the stored refresh token.\n\
             Run: bmsdash login --profile {profile}"
        )
    )]
    SessionExpired { profile: String, reason: String },

    #[error("Login rejected: {reason}")]
    #[diagnostic(
        code(bmsdash::login_failed),
        help("Check the username and password for profile '{profile}'.")
    )]
    LoginFailed { profile: String, reason: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Server rejected the request (HTTP {status} {status_text})")]
    #[diagnostic(code(bmsdash::server_rejected))]
    ServerRejected {
        status: u16,
        status_text: String,
        #[help]
        body: Option<String>,
    },

    #[error("Could not reach backend at {url}")]
    #[diagnostic(
        code(bmsdash::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile.\n\
             Cause: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(bmsdash::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    #[error("Request could not be made: {message}")]
    #[diagnostic(code(bmsdash::request_failed))]
    RequestFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bmsdash::validation))]
    Validation { field: String, reason: String },

    #[error("No device domain given and no active application selected")]
    #[diagnostic(
        code(bmsdash::no_domain),
        help("Pass a domain (electrical, temperature) or run: bmsdash app select")
    )]
    NoDomain,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bmsdash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: bmsdash config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No API URL configured")]
    #[diagnostic(
        code(bmsdash::no_config),
        help(
            "Create a profile with: bmsdash config init\n\
             Or pass --api-url / set BMSDASH_API_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(bmsdash::config))]
    Config(ConfigError),

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(bmsdash::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotLoggedIn { .. } | Self::SessionExpired { .. } | Self::LoginFailed { .. } => {
                exit_code::AUTH
            }
            Self::ServerRejected { .. } => exit_code::SERVER,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoDomain => exit_code::USAGE,
            Self::ProfileNotFound { .. } | Self::NoConfig { .. } => exit_code::NOT_FOUND,
            Self::RequestFailed { .. } | Self::Config(_) | Self::Internal(_) | Self::Io(_) => {
                exit_code::GENERAL
            }
        }
    }

    /// Attach the active profile name to a core error.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::NotAuthenticated { message } => Self::NotLoggedIn {
                profile: profile.into(),
                reason: message,
            },
            CoreError::SessionExpired { message } => Self::SessionExpired {
                profile: profile.into(),
                reason: message,
            },
            CoreError::ServerRejected {
                status: 401,
                body,
                ..
            } => Self::SessionExpired {
                profile: profile.into(),
                reason: if body.is_empty() {
                    "access token rejected".into()
                } else {
                    body
                },
            },
            CoreError::ServerRejected {
                status,
                status_text,
                body,
            } => Self::ServerRejected {
                status,
                status_text,
                body: (!body.is_empty()).then_some(body),
            },
            CoreError::NetworkUnreachable { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::RequestFailed { message } => Self::RequestFailed { message },
            CoreError::Config { message } => Self::Validation {
                field: "connection".into(),
                reason: message,
            },
            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_exit_with_auth_code() {
        let err = CliError::from_core(
            CoreError::SessionExpired {
                message: "refresh rejected".into(),
            },
            "plant",
        );
        assert_eq!(err.exit_code(), exit_code::AUTH);

        let err = CliError::from_core(
            CoreError::ServerRejected {
                status: 401,
                status_text: "Unauthorized".into(),
                body: String::new(),
            },
            "plant",
        );
        assert!(matches!(err, CliError::SessionExpired { .. }));
    }

    #[test]
    fn server_errors_keep_status() {
        let err = CliError::from_core(
            CoreError::ServerRejected {
                status: 503,
                status_text: "Service Unavailable".into(),
                body: "maintenance".into(),
            },
            "plant",
        );
        assert_eq!(err.exit_code(), exit_code::SERVER);
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let err: CliError = ConfigError::UnknownProfile {
            name: "lab".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
