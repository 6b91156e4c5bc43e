// Platform HTTP client
//
// Wraps `reqwest::Client` with tenant-relative URL construction, request
// decoration and error-body parsing. Endpoint groups (alarms, inventory,
// login) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{AuthStrategy, Credentials, tenant_url};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Error body shape used by the platform for every non-2xx response.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Raw HTTP client for one tenant.
///
/// Holds the active request decoration: the headers produced by an
/// [`AuthStrategy`] are attached to every outgoing request until
/// [`clear_auth`](Self::clear_auth) is called.
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    decoration: RwLock<Option<Decoration>>,
}

#[derive(Clone)]
struct Decoration {
    strategy: AuthStrategy,
    headers: HeaderMap,
}

impl PlatformClient {
    /// Create a client for the given tenant address.
    ///
    /// Fails fast with [`Error::InvalidTenantUrl`] before any network I/O.
    pub fn new(tenant: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = tenant_url(tenant)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            decoration: RwLock::new(None),
        }
    }

    /// The underlying HTTP client (for flows that must bypass decoration).
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The tenant base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Request decoration ──────────────────────────────────────────

    /// Decorate all subsequent requests with `strategy` for `credentials`.
    pub fn apply_auth(&self, strategy: AuthStrategy, credentials: &Credentials) -> Result<(), Error> {
        let headers = strategy.headers(credentials)?;
        debug!(?strategy, "applying request decoration");
        *self
            .decoration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Decoration { strategy, headers });
        Ok(())
    }

    /// Drop the request decoration (logout).
    pub fn clear_auth(&self) {
        debug!("clearing request decoration");
        *self
            .decoration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The strategy currently decorating requests, if any.
    pub fn auth_strategy(&self) -> Option<AuthStrategy> {
        self.decoration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| d.strategy)
    }

    fn decorate(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let guard = self
            .decoration
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(decoration) => builder.headers(decoration.headers.clone()),
            None => builder,
        }
    }

    // ── URL builder ─────────────────────────────────────────────────

    /// Join a tenant-relative path (e.g. `"alarm/alarms"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ─────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.decorate(self.http.get(url)).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.decorate(self.http.get(url).query(params)).send().await?;
        handle_response(resp).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.decorate(self.http.put(url).json(body)).send().await?;
        handle_response(resp).await
    }
}

// ── Response handling ───────────────────────────────────────────────

/// Decode a 2xx JSON body, or map the failure.
pub(crate) async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if !status.is_success() {
        return Err(parse_error(status, resp).await);
    }

    let body = resp.text().await?;
    trace!(len = body.len(), "response body received");
    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body,
        }
    })
}

/// Turn a non-2xx response into an [`Error`].
pub(crate) async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Error::Unauthorized;
    }

    let raw = resp.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(err) => Error::Api {
            status: status.as_u16(),
            message: err
                .message
                .or_else(|| err.error.clone())
                .unwrap_or_else(|| status.to_string()),
            code: err.error,
        },
        Err(_) => Error::Api {
            status: status.as_u16(),
            message: if raw.is_empty() {
                status.to_string()
            } else {
                raw
            },
            code: None,
        },
    }
}
