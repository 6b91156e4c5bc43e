//! CLI configuration: a thin layer over `alarmist_config`.
//!
//! Loads the shared config and applies `GlobalOpts` flag overrides
//! (--tenant, --page-size, --insecure, ...).

use std::path::PathBuf;

use alarmist_config::{Config, KeyringCredentialStore, config_path, load_config_from};
use alarmist_core::{Preferences, Session};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Session type every command works with.
pub type CliSession = Session<KeyringCredentialStore>;

/// Config file in effect: `--config` or the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file and apply command-line overrides.
///
/// Flags win over the file, which wins over built-in defaults.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&effective_path(global))?;

    if let Some(ref tenant) = global.tenant {
        cfg.tenant = Some(tenant.clone());
    }
    if let Some(ref username) = global.username {
        cfg.username = Some(username.clone());
    }
    if let Some(page_size) = global.page_size {
        cfg.defaults.page_size = page_size;
    }
    if let Some(timeout) = global.timeout {
        cfg.defaults.timeout = timeout;
    }
    if global.insecure {
        cfg.defaults.insecure = true;
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn open_session(cfg: &Config) -> CliSession {
    Session::new(cfg.transport(), KeyringCredentialStore::open_default())
}

/// Tenant and username for a login: config/flags first, then what the last
/// login remembered.
pub fn login_target(
    cfg: &Config,
    remembered: Option<&Preferences>,
    global: &GlobalOpts,
) -> Result<(String, String), CliError> {
    let path = effective_path(global).display().to_string();
    let tenant = cfg
        .tenant
        .clone()
        .or_else(|| remembered.map(|p| p.tenant.clone()))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CliError::MissingLoginDetail {
            what: "tenant",
            env: "TENANT",
            path: path.clone(),
        })?;
    let username = cfg
        .username
        .clone()
        .or_else(|| remembered.map(|p| p.username.clone()))
        .filter(|u| !u.trim().is_empty())
        .ok_or(CliError::MissingLoginDetail {
            what: "username",
            env: "USERNAME",
            path,
        })?;
    Ok((tenant, username))
}
