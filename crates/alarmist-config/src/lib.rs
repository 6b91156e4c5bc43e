//! Shared configuration for alarmist front ends.
//!
//! TOML settings layered with `ALARMIST_` environment overrides, the
//! platform config directory, and the keyring-backed credential store the
//! session persists into.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use alarmist_api::{RetryPolicy, TlsMode, TransportConfig};
use alarmist_core::{AlarmFilter, DEFAULT_PAGE_SIZE};

pub mod store;

pub use store::{KeyringCredentialStore, KeyringVault, SecretVault};

/// Largest page the platform serves.
pub const MAX_PAGE_SIZE: u32 = 2000;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Tenant address used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Filter behind the "subscribed" alarm list.
    #[serde(default)]
    pub subscription: AlarmFilter,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Extra attempts for alarm status changes.
    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            ca_cert: None,
            timeout: default_timeout(),
            page_size: default_page_size(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl Config {
    /// Reject values the platform or the transport cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page_size = self.defaults.page_size;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Validation {
                field: "defaults.page_size".into(),
                reason: format!("expected 1..={MAX_PAGE_SIZE}, got {page_size}"),
            });
        }
        if self.defaults.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        Ok(())
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.defaults.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.defaults.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.defaults.timeout),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.defaults.retries,
            Duration::from_millis(self.defaults.retry_delay_ms),
        )
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Platform config directory (`~/.config/alarmist` on Linux).
pub fn config_dir() -> PathBuf {
    ProjectDirs::from("io", "alarmist", "alarmist").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("alarmist");
            p
        },
        |dirs| dirs.config_dir().to_path_buf(),
    )
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Remembered username / user id / tenant, next to the config file.
pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences.toml")
}

// ── Loading & saving ────────────────────────────────────────────────

/// Layer defaults, the TOML file at `path` (if present), then
/// `ALARMIST_*` variables. Nested keys use a double underscore, e.g.
/// `ALARMIST_DEFAULTS__PAGE_SIZE=100`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ALARMIST_").split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
