use thiserror::Error;

/// Top-level error type for the `alarmist-api` crate.
///
/// Covers every failure mode across the platform endpoints:
/// login, transport, alarm queries and the async adapters.
/// `alarmist-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The login exchange did not yield a session (non-2xx response,
    /// missing `authorization` or `XSRF-TOKEN` cookie, unusable form).
    #[error("Login failed: {message}")]
    LoginFailed { message: String },

    /// The tenant advertised no login option we can use.
    #[error("No usable login option advertised by the tenant")]
    MissingLoginOption,

    /// The platform rejected the request decoration (HTTP 401).
    #[error("Unauthorized -- credentials rejected or session expired")]
    Unauthorized,

    // ── Input ───────────────────────────────────────────────────────
    /// The tenant string cannot be resolved into a base URL.
    #[error("Invalid tenant URL: {0}")]
    InvalidTenantUrl(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Platform API ────────────────────────────────────────────────
    /// Non-2xx response, with the platform's `{error, message}` body when present.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Async adapters ──────────────────────────────────────────────
    /// A producer completed without ever emitting a value.
    #[error("Producer completed without output")]
    NoOutput,

    /// The awaiting caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Marker for a producer that finished without emitting.
///
/// Kept separate from [`Error`] so [`first_value`](crate::single::first_value)
/// can be used with any error type that knows how to represent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("producer completed without output")]
pub struct NoOutput;

impl From<NoOutput> for Error {
    fn from(_: NoOutput) -> Self {
        Self::NoOutput
    }
}

/// Marker for a cancellation observed through a `CancellationToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

impl From<Cancelled> for Error {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl Error {
    /// Returns `true` for failures that should drop the user back to
    /// the login screen.
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. } | Self::MissingLoginOption | Self::Unauthorized
        )
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the platform error code (e.g. `"alarm/Not Found"`), if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_failures_are_grouped() {
        assert!(Error::MissingLoginOption.is_login_failure());
        assert!(Error::Unauthorized.is_login_failure());
        assert!(
            Error::LoginFailed {
                message: "no cookies".into()
            }
            .is_login_failure()
        );
        assert!(!Error::NoOutput.is_login_failure());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            code: None,
            message: "unavailable".into(),
        };
        assert!(err.is_transient());

        let err = Error::Api {
            status: 422,
            code: Some("alarm/invalid".into()),
            message: "bad status".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.api_error_code(), Some("alarm/invalid"));
    }

    #[test]
    fn markers_convert() {
        assert!(matches!(Error::from(NoOutput), Error::NoOutput));
        assert!(matches!(Error::from(Cancelled), Error::Cancelled));
    }
}
