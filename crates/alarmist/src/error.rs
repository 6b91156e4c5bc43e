//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use alarmist_config::ConfigError;
use alarmist_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}")]
    #[diagnostic(
        code(alarmist::connection_failed),
        help(
            "Check the tenant address and your network connection.\n\
             Self-signed tenants need --insecure (-k) or defaults.ca_cert."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(alarmist::timeout),
        help("Increase the timeout with --timeout or defaults.timeout.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(alarmist::auth_failed),
        help("Check username, password and tenant, then run: alarmist login")
    )]
    AuthFailed,

    #[error("Not logged in")]
    #[diagnostic(code(alarmist::not_logged_in), help("Run: alarmist login"))]
    NotLoggedIn,

    #[error("No {what} given")]
    #[diagnostic(
        code(alarmist::missing_login_detail),
        help("Pass --{what}, set ALARMIST_{env}, or add `{what} = \"...\"` to {path}")
    )]
    MissingLoginDetail {
        what: &'static str,
        env: &'static str,
        path: String,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(alarmist::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(alarmist::api_error))]
    ApiError { code: String, message: String },

    #[error("No alarms could be loaded: {message}")]
    #[diagnostic(code(alarmist::list_failed))]
    ListFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(alarmist::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(alarmist::config),
        help("Check the config file and ALARMIST_* environment variables.")
    )]
    Config(#[from] ConfigError),

    #[error("Credential storage failed: {message}")]
    #[diagnostic(
        code(alarmist::credential_store),
        help("The system keyring may be locked or unavailable.")
    )]
    CredentialStore { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(alarmist::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed | Self::NotLoggedIn | Self::MissingLoginDetail { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            // Never echo which part of the login was wrong.
            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed,

            CoreError::NotAuthenticated => CliError::NotLoggedIn,

            CoreError::Timeout => CliError::Timeout,

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Api { message, code, .. } => CliError::ApiError {
                code: code.unwrap_or_default(),
                message,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "tenant".into(),
                reason: message,
            },

            CoreError::CredentialStore { message } => CliError::CredentialStore { message },

            CoreError::Cancelled => CliError::Internal("operation cancelled".into()),
            CoreError::NoOutput => CliError::Internal("no result produced".into()),
            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<alarmist_api::Error> for CliError {
    fn from(err: alarmist_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
