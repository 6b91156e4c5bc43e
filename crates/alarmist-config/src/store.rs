// ── Persistent credential store ──
//
// Preferences (username, user id, tenant) live in a TOML file next to the
// config. Secrets (password, session cookies) live in the OS keyring as a
// JSON blob keyed by user id. All I/O runs on the blocking pool, one
// operation at a time and in call order. A blocking task keeps running when
// its caller is dropped, so the permit travels with the task: a purge issued
// after an abandoned save waits for that save to land.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alarmist_api::{Credentials, SessionCookies};
use alarmist_core::{CoreError, CredentialStore, Preferences};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Keyring service name for alarmist secrets.
pub const KEYRING_SERVICE: &str = "alarmist";

/// Minimal secret storage; implemented over the OS keyring.
pub trait SecretVault: Send + Sync + 'static {
    fn get(&self, account: &str) -> Result<Option<String>, CoreError>;
    fn set(&self, account: &str, secret: &str) -> Result<(), CoreError>;
    /// Remove the entry; a missing entry is not an error.
    fn delete(&self, account: &str) -> Result<(), CoreError>;
}

/// The platform keyring (Keychain, Credential Manager, Secret Service).
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &str) -> Result<keyring::Entry, CoreError> {
        keyring::Entry::new(&self.service, account).map_err(keyring_error)
    }
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl SecretVault for KeyringVault {
    fn get(&self, account: &str) -> Result<Option<String>, CoreError> {
        match self.entry(account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn set(&self, account: &str, secret: &str) -> Result<(), CoreError> {
        self.entry(account)?
            .set_password(secret)
            .map_err(keyring_error)
    }

    fn delete(&self, account: &str) -> Result<(), CoreError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

fn keyring_error(err: keyring::Error) -> CoreError {
    CoreError::CredentialStore {
        message: format!("keyring: {err}"),
    }
}

/// Secret half of the credentials, as stored in the vault.
#[derive(Serialize, Deserialize)]
struct StoredSecret {
    password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<SessionCookies>,
}

/// Credential store over a preferences file and a [`SecretVault`].
#[derive(Debug)]
pub struct KeyringCredentialStore<V = KeyringVault> {
    inner: Arc<Inner<V>>,
    io: Arc<Mutex<()>>,
}

#[derive(Debug)]
struct Inner<V> {
    preferences_path: PathBuf,
    vault: V,
}

impl<V> Clone for KeyringCredentialStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            io: Arc::clone(&self.io),
        }
    }
}

impl KeyringCredentialStore<KeyringVault> {
    /// Store at the canonical preferences path, backed by the OS keyring.
    pub fn open_default() -> Self {
        Self::new(crate::preferences_path(), KeyringVault::default())
    }
}

impl<V: SecretVault> KeyringCredentialStore<V> {
    pub fn new(preferences_path: impl Into<PathBuf>, vault: V) -> Self {
        Self {
            inner: Arc::new(Inner {
                preferences_path: preferences_path.into(),
                vault,
            }),
            io: Arc::new(Mutex::new(())),
        }
    }

    pub fn preferences_path(&self) -> &Path {
        &self.inner.preferences_path
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner<V>) -> Result<T, CoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let permit = Arc::clone(&self.io).lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task(&inner)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("credential task failed: {e}")))?
    }
}

impl<V: SecretVault> Inner<V> {
    fn read_preferences(&self) -> Result<Option<Preferences>, CoreError> {
        let raw = match std::fs::read_to_string(&self.preferences_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&e)),
        };
        toml::from_str(&raw)
            .map(Some)
            .map_err(|e| CoreError::CredentialStore {
                message: format!("unreadable preferences: {e}"),
            })
    }

    fn write_preferences(&self, preferences: &Preferences) -> Result<(), CoreError> {
        if let Some(parent) = self.preferences_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(&e))?;
        }
        let raw = toml::to_string_pretty(preferences).map_err(|e| CoreError::CredentialStore {
            message: format!("cannot serialize preferences: {e}"),
        })?;
        std::fs::write(&self.preferences_path, raw).map_err(|e| io_error(&e))
    }

    fn load(&self) -> Result<Option<Credentials>, CoreError> {
        let Some(prefs) = self.read_preferences()? else {
            return Ok(None);
        };
        let Some(user_id) = prefs.user_id else {
            return Ok(None);
        };
        let Some(raw) = self.vault.get(&user_id)? else {
            debug!(%user_id, "no secret stored");
            return Ok(None);
        };
        let secret: StoredSecret =
            serde_json::from_str(&raw).map_err(|e| CoreError::CredentialStore {
                message: format!("unreadable secret: {e}"),
            })?;

        let mut credentials = Credentials::new(
            prefs.username,
            prefs.tenant,
            SecretString::from(secret.password),
        );
        credentials.user_id = Some(user_id);
        credentials.session = secret.session;
        Ok(Some(credentials))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CoreError> {
        let user_id = credentials
            .user_id
            .as_deref()
            .ok_or_else(|| CoreError::CredentialStore {
                message: "credentials have no user id".into(),
            })?;

        // A different user may have been stored before; drop their secret.
        if let Some(previous) = self.read_preferences()?.and_then(|p| p.user_id) {
            if previous != user_id {
                self.vault.delete(&previous)?;
            }
        }

        let secret = StoredSecret {
            password: credentials.password.expose_secret().to_owned(),
            session: credentials.session.clone(),
        };
        let raw = serde_json::to_string(&secret).map_err(|e| CoreError::CredentialStore {
            message: format!("cannot serialize secret: {e}"),
        })?;
        self.vault.set(user_id, &raw)?;
        self.write_preferences(&Preferences::from_credentials(credentials))?;
        debug!(%user_id, "credentials saved");
        Ok(())
    }

    fn purge(&self) -> Result<(), CoreError> {
        if let Some(user_id) = self.read_preferences()?.and_then(|p| p.user_id) {
            self.vault.delete(&user_id)?;
            debug!(%user_id, "secret purged");
        }
        Ok(())
    }
}

fn io_error(err: &std::io::Error) -> CoreError {
    CoreError::CredentialStore {
        message: format!("preferences file: {err}"),
    }
}

impl<V: SecretVault> CredentialStore for KeyringCredentialStore<V> {
    async fn load(&self) -> Result<Option<Credentials>, CoreError> {
        self.blocking(Inner::load).await
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), CoreError> {
        let credentials = credentials.clone();
        self.blocking(move |inner| inner.save(&credentials)).await
    }

    async fn purge(&self) -> Result<(), CoreError> {
        self.blocking(Inner::purge).await
    }

    async fn preferences(&self) -> Result<Option<Preferences>, CoreError> {
        self.blocking(Inner::read_preferences).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use alarmist_api::SessionCookie;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct MapVault(Mutex<HashMap<String, String>>);

    impl SecretVault for MapVault {
        fn get(&self, account: &str) -> Result<Option<String>, CoreError> {
            Ok(self.0.lock().unwrap().get(account).cloned())
        }
        fn set(&self, account: &str, secret: &str) -> Result<(), CoreError> {
            self.0
                .lock()
                .unwrap()
                .insert(account.to_owned(), secret.to_owned());
            Ok(())
        }
        fn delete(&self, account: &str) -> Result<(), CoreError> {
            self.0.lock().unwrap().remove(account);
            Ok(())
        }
    }

    /// Vault whose writes take a while, like a keyring behind D-Bus.
    #[derive(Default)]
    struct SlowVault(MapVault);

    impl SecretVault for SlowVault {
        fn get(&self, account: &str) -> Result<Option<String>, CoreError> {
            self.0.get(account)
        }
        fn set(&self, account: &str, secret: &str) -> Result<(), CoreError> {
            std::thread::sleep(std::time::Duration::from_millis(300));
            self.0.set(account, secret)
        }
        fn delete(&self, account: &str) -> Result<(), CoreError> {
            self.0.delete(account)
        }
    }

    fn credentials(user_id: &str) -> Credentials {
        let mut creds = Credentials::new("jane", "acme.example.com", SecretString::from("s3cret"));
        creds.user_id = Some(user_id.into());
        creds.session = Some(SessionCookies {
            authorization: SessionCookie::new("authorization", "tok-a"),
            xsrf_token: SessionCookie::new("XSRF-TOKEN", "tok-x"),
        });
        creds
    }

    fn store(dir: &tempfile::TempDir) -> KeyringCredentialStore<MapVault> {
        KeyringCredentialStore::new(dir.path().join("preferences.toml"), MapVault::default())
    }

    #[tokio::test]
    async fn empty_store_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.load().await.unwrap().is_none());
        assert!(store.preferences().await.unwrap().is_none());
        store.purge().await.unwrap();
    }

    #[tokio::test]
    async fn saved_credentials_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.save(&credentials("u-1")).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded.username, "jane");
        assert_eq!(loaded.tenant, "acme.example.com");
        assert_eq!(loaded.password.expose_secret(), "s3cret");
        assert_eq!(loaded.user_id.as_deref(), Some("u-1"));
        assert_eq!(loaded.session.unwrap().xsrf_token.value, "tok-x");
        assert!(store.inner.vault.get("u-1").unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_keeps_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save(&credentials("u-1")).await.unwrap();

        store.purge().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        let prefs = store.preferences().await.unwrap().unwrap();
        assert_eq!(prefs.username, "jane");
        assert_eq!(prefs.user_id.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn switching_user_drops_previous_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save(&credentials("u-1")).await.unwrap();

        store.save(&credentials("u-2")).await.unwrap();

        assert!(store.inner.vault.get("u-1").unwrap().is_none());
        assert!(store.inner.vault.get("u-2").unwrap().is_some());
    }

    #[tokio::test]
    async fn save_requires_user_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let creds = Credentials::new("jane", "acme.example.com", SecretString::from("s3cret"));

        let err = store.save(&creds).await.unwrap_err();

        assert!(matches!(err, CoreError::CredentialStore { .. }));
        assert!(!store.preferences_path().exists());
    }

    #[tokio::test]
    async fn purge_waits_for_an_abandoned_save() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            KeyringCredentialStore::new(dir.path().join("preferences.toml"), SlowVault::default());

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            store.save(&credentials("u-1")),
        )
        .await;
        assert!(abandoned.is_err(), "save should still be running");

        store.purge().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
        assert!(store.inner.vault.get("u-1").unwrap().is_none());
        let prefs = store.preferences().await.unwrap().unwrap();
        assert_eq!(prefs.user_id.as_deref(), Some("u-1"));
    }
}
