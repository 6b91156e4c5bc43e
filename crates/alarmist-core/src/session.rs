// ── Session lifecycle ──
//
// Explicit session context: owns the tenant client, the credential store
// and the observable authentication state. Login and logout are mutually
// exclusive; a login that fails or is dropped mid-way leaves the session
// unauthenticated with the stored secrets purged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use alarmist_api::{
    AuthStrategy, Credentials, LoginOptionType, PlatformClient, TransportConfig, first_value,
    select_login_option,
};
use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::credentials::{CredentialStore, Preferences};
use crate::error::CoreError;

/// Authentication state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated { user_id: String },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// One authenticated (or not yet authenticated) user session.
///
/// Cheaply cloneable via `Arc<SessionInner>`.
pub struct Session<C: CredentialStore> {
    inner: Arc<SessionInner<C>>,
}

impl<C: CredentialStore> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<C> {
    transport: TransportConfig,
    store: C,
    state: watch::Sender<SessionState>,
    client: RwLock<Option<Arc<PlatformClient>>>,
    /// Serialises login, logout and restore.
    gate: Mutex<()>,
    /// Set when a login was dropped before it could purge.
    purge_pending: AtomicBool,
}

impl<C: CredentialStore> Session<C> {
    pub fn new(transport: TransportConfig, store: C) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                store,
                state,
                client: RwLock::new(None),
                gate: Mutex::new(()),
                purge_pending: AtomicBool::new(false),
            }),
        }
    }

    pub fn store(&self) -> &C {
        &self.inner.store
    }

    // ── Observation ─────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Stream of state changes, starting with the current state.
    pub fn subscribe(&self) -> WatchStream<SessionState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Resolve with the user id once the session is authenticated.
    pub async fn wait_until_authenticated(&self) -> Result<String, CoreError> {
        let authenticated = self.subscribe().filter_map(|state| {
            std::future::ready(match state {
                SessionState::Authenticated { user_id } => Some(Ok(user_id)),
                SessionState::Unauthenticated | SessionState::Authenticating => None,
            })
        });
        first_value(authenticated).await
    }

    /// The decorated client of an authenticated session.
    pub fn client(&self) -> Result<Arc<PlatformClient>, CoreError> {
        self.inner
            .client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CoreError::NotAuthenticated)
    }

    /// Remembered username and tenant, for pre-filling a login.
    pub async fn preferences(&self) -> Result<Option<Preferences>, CoreError> {
        self.inner.store.preferences().await
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Authenticate with `credentials` and persist them on success.
    ///
    /// Returns the resolved user id. On any failure, and when the returned
    /// future is dropped before completion, stored secrets are purged and
    /// the session is left unauthenticated.
    pub async fn login(&self, credentials: Credentials) -> Result<String, CoreError> {
        let _gate = self.inner.gate.lock().await;
        self.inner.settle_pending_purge().await;

        if !credentials.is_valid() {
            return Err(CoreError::AuthenticationFailed {
                message: "username, tenant and password are all empty".into(),
            });
        }
        // Malformed tenants fail before any request or state change.
        credentials.tenant_url()?;

        self.inner.set_state(SessionState::Authenticating);
        let guard = LoginGuard {
            inner: Some(Arc::clone(&self.inner)),
        };

        let result = self.inner.authenticate(credentials).await;
        guard.disarm();

        match result {
            Ok((client, user_id)) => {
                *self
                    .inner
                    .client
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(client);
                self.inner.set_state(SessionState::Authenticated {
                    user_id: user_id.clone(),
                });
                info!(%user_id, "logged in");
                Ok(user_id)
            }
            Err(err) => {
                warn!(error = %err, "login failed");
                self.inner.reset_to_unauthenticated();
                if let Err(purge_err) = self.inner.store.purge().await {
                    warn!(error = %purge_err, "failed to purge stored credentials");
                }
                Err(err)
            }
        }
    }

    /// Silent re-authentication from stored credentials.
    ///
    /// No request is made: the stored cookies (or the password) decorate
    /// the client directly. Expired cookies are purged. Returns whether the
    /// session is now authenticated.
    pub async fn restore(&self) -> Result<bool, CoreError> {
        let _gate = self.inner.gate.lock().await;
        self.inner.settle_pending_purge().await;

        let Some(credentials) = self.inner.store.load().await? else {
            debug!("no stored credentials");
            return Ok(false);
        };

        if credentials
            .session
            .as_ref()
            .is_some_and(|s| s.is_expired(Utc::now()))
        {
            info!("stored session expired, login required");
            self.inner.store.purge().await?;
            self.inner.reset_to_unauthenticated();
            return Ok(false);
        }

        let Some(user_id) = credentials.user_id.clone() else {
            debug!("stored credentials lack a user id");
            return Ok(false);
        };

        let client = PlatformClient::new(&credentials.tenant, &self.inner.transport)?;
        let strategy = AuthStrategy::select(None, &credentials);
        client.apply_auth(strategy, &credentials)?;

        *self
            .inner
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(client));
        self.inner.set_state(SessionState::Authenticated {
            user_id: user_id.clone(),
        });
        info!(%user_id, ?strategy, "session restored");
        Ok(true)
    }

    /// Purge stored secrets and drop the decoration. Preferences are kept.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let _gate = self.inner.gate.lock().await;
        self.inner.settle_pending_purge().await;

        let purged = self.inner.store.purge().await;
        self.inner.reset_to_unauthenticated();
        info!("logged out");
        purged
    }
}

impl<C: CredentialStore> SessionInner<C> {
    fn set_state(&self, state: SessionState) {
        debug!(?state, "session state");
        self.state.send_replace(state);
    }

    fn reset_to_unauthenticated(&self) {
        let previous = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = previous {
            client.clear_auth();
        }
        self.set_state(SessionState::Unauthenticated);
    }

    /// Run a purge left behind by a dropped login. Caller holds the gate.
    async fn settle_pending_purge(&self) {
        if self.purge_pending.swap(false, Ordering::SeqCst) {
            debug!("purging credentials of an abandoned login");
            if let Err(err) = self.store.purge().await {
                warn!(error = %err, "failed to purge stored credentials");
            }
        }
    }

    /// The login exchange proper: options, credentials, decoration, user id.
    async fn authenticate(
        &self,
        mut credentials: Credentials,
    ) -> Result<(Arc<PlatformClient>, String), CoreError> {
        let client = PlatformClient::new(&credentials.tenant, &self.transport)?;

        let options = client.login_options().await?;
        let option = select_login_option(&options).ok_or(alarmist_api::Error::MissingLoginOption)?;
        debug!(option = option.option_type.as_str(), "login option selected");

        if option.option_type == LoginOptionType::OAuth2Internal {
            let cookies = client.oauth_login(&credentials, option).await?;
            credentials.session = Some(cookies);
        } else {
            credentials.session = None;
        }

        let strategy = AuthStrategy::select(Some(&option.option_type), &credentials);
        client.apply_auth(strategy, &credentials)?;

        let user = client.current_user().await?;
        credentials.user_id = Some(user.id.clone());
        credentials.otp = None;

        self.store.save(&credentials).await?;
        Ok((Arc::new(client), user.id))
    }
}

/// Leaves the session unauthenticated if a login future is dropped.
struct LoginGuard<C: CredentialStore> {
    inner: Option<Arc<SessionInner<C>>>,
}

impl<C: CredentialStore> LoginGuard<C> {
    fn disarm(mut self) {
        self.inner = None;
    }
}

impl<C: CredentialStore> Drop for LoginGuard<C> {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };
        warn!("login abandoned before completion");
        inner.purge_pending.store(true, Ordering::SeqCst);
        inner.reset_to_unauthenticated();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let _gate = inner.gate.lock().await;
                inner.settle_pending_purge().await;
            });
        }
    }
}
