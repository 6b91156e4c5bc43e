// ── Core error types ──
//
// User-facing errors from alarmist-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<alarmist_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Platform error code (e.g. `"alarm/Not Found"`).
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Credential store error: {message}")]
    CredentialStore { message: String },

    // ── Async control flow ───────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation completed without a result")]
    NoOutput,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the caller should be sent back to the login step.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed { .. } | Self::NotAuthenticated
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<alarmist_api::Error> for CoreError {
    fn from(err: alarmist_api::Error) -> Self {
        use alarmist_api::Error as Api;

        match err {
            Api::LoginFailed { message } => CoreError::AuthenticationFailed { message },
            Api::MissingLoginOption => CoreError::AuthenticationFailed {
                message: "tenant offers no supported login option".into(),
            },
            Api::Unauthorized => CoreError::AuthenticationFailed {
                message: "credentials rejected or session expired".into(),
            },
            Api::InvalidTenantUrl(message) => CoreError::Config {
                message: format!("Invalid tenant: {message}"),
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "resource".into(),
                identifier: message,
            },
            Api::Api {
                status,
                code,
                message,
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
            Api::NoOutput => CoreError::NoOutput,
            Api::Cancelled => CoreError::Cancelled,
        }
    }
}

impl From<alarmist_api::Cancelled> for CoreError {
    fn from(_: alarmist_api::Cancelled) -> Self {
        CoreError::Cancelled
    }
}

impl From<alarmist_api::NoOutput> for CoreError {
    fn from(_: alarmist_api::NoOutput) -> Self {
        CoreError::NoOutput
    }
}
