// ── Credential persistence seam ──
//
// Secrets (password, session cookies) and plain preferences (username,
// user id, tenant) are stored separately. Purging removes the secrets but
// keeps the preferences so the next login can be pre-filled.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use alarmist_api::Credentials;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Non-secret login details remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub username: String,
    /// Set once a login succeeded; keys the secret entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub tenant: String,
}

impl Preferences {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username.clone(),
            user_id: credentials.user_id.clone(),
            tenant: credentials.tenant.clone(),
        }
    }
}

/// Process-wide credential storage.
///
/// Writes only happen from the session's login/logout path, which
/// serialises them. Operations take effect in call order, even when the
/// future of an earlier call was dropped while its write was under way.
pub trait CredentialStore: Send + Sync + 'static {
    /// Stored credentials, or `None` when any part is missing.
    fn load(&self) -> impl Future<Output = Result<Option<Credentials>, CoreError>> + Send;

    /// Persist credentials that carry a resolved user id.
    fn save(&self, credentials: &Credentials) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Remove the secrets; preferences stay.
    fn purge(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn preferences(&self) -> impl Future<Output = Result<Option<Preferences>, CoreError>> + Send;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    secret: Option<Credentials>,
    preferences: Option<Preferences>,
    saves: usize,
    purges: usize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `credentials`, as if saved by an earlier run.
    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            state.preferences = Some(Preferences::from_credentials(&credentials));
            state.secret = Some(credentials);
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_secret(&self) -> bool {
        self.lock().secret.is_some()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn purge_count(&self) -> usize {
        self.lock().purges
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> impl Future<Output = Result<Option<Credentials>, CoreError>> + Send {
        let loaded = self.lock().secret.clone();
        std::future::ready(Ok(loaded))
    }

    fn save(&self, credentials: &Credentials) -> impl Future<Output = Result<(), CoreError>> + Send {
        let result = if credentials.user_id.is_some() {
            let mut state = self.lock();
            state.preferences = Some(Preferences::from_credentials(credentials));
            state.secret = Some(credentials.clone());
            state.saves += 1;
            Ok(())
        } else {
            Err(CoreError::CredentialStore {
                message: "credentials have no user id".into(),
            })
        };
        std::future::ready(result)
    }

    fn purge(&self) -> impl Future<Output = Result<(), CoreError>> + Send {
        {
            let mut state = self.lock();
            state.secret = None;
            state.purges += 1;
        }
        std::future::ready(Ok(()))
    }

    fn preferences(&self) -> impl Future<Output = Result<Option<Preferences>, CoreError>> + Send {
        std::future::ready(Ok(self.lock().preferences.clone()))
    }
}
