// ── Credentials and request decoration ──
//
// Two decoration strategies exist: HTTP Basic and the platform's internal
// OAuth, which forwards the `authorization` + `XSRF-TOKEN` session cookies
// together with an anti-forgery header. Which one applies is a pure
// function of the advertised login option and the credentials at hand.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, COOKIE, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Name of the session cookie carrying the access token.
pub const AUTHORIZATION_COOKIE: &str = "authorization";
/// Name of the session cookie carrying the anti-forgery token.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
/// Anti-forgery request header; must echo the `XSRF-TOKEN` cookie.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";
/// Tells the platform not to answer with a browser basic-auth challenge.
pub const USE_X_BASIC_HEADER: &str = "UseXBasic";

// ── Login options ───────────────────────────────────────────────────

/// Authentication strategy type as advertised by `/tenant/loginOptions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LoginOptionType {
    Basic,
    OAuth2Internal,
    /// Any other advertised type (`OAUTH2`, `SSO`, ...), kept verbatim.
    Other(String),
}

impl LoginOptionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Basic => "BASIC",
            Self::OAuth2Internal => "OAUTH2_INTERNAL",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for LoginOptionType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "BASIC" => Self::Basic,
            "OAUTH2_INTERNAL" => Self::OAuth2Internal,
            _ => Self::Other(raw),
        }
    }
}

impl From<LoginOptionType> for String {
    fn from(value: LoginOptionType) -> Self {
        match value {
            LoginOptionType::Other(raw) => raw,
            other => other.as_str().to_owned(),
        }
    }
}

/// A server-advertised authentication strategy descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOption {
    #[serde(rename = "type")]
    pub option_type: LoginOptionType,
    /// Absolute URL the credentials form is posted to (OAuth variants only).
    #[serde(default)]
    pub init_request: Option<String>,
    #[serde(default)]
    pub user_management_source: Option<String>,
    #[serde(default)]
    pub visible_on_login_page: bool,
    #[serde(default)]
    pub id: Option<String>,
}

impl LoginOption {
    /// Whether the option is backed by the tenant's own user database.
    pub fn is_internal(&self) -> bool {
        self.user_management_source.as_deref() == Some("INTERNAL")
    }
}

// ── Session cookies ─────────────────────────────────────────────────

/// One cookie from a login response, reduced to what needs persisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
        }
    }

    /// Cookies without an expiry are session cookies and never expire here.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at < now)
    }
}

/// The cookie pair that backs an internal-OAuth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookies {
    pub authorization: SessionCookie,
    pub xsrf_token: SessionCookie,
}

impl SessionCookies {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.authorization.is_expired(now) || self.xsrf_token.is_expired(now)
    }
}

// ── Credentials ─────────────────────────────────────────────────────

/// Everything needed to authenticate one user against one tenant.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    /// Tenant address as entered by the user (`acme.example.com` or a full URL).
    pub tenant: String,
    pub password: SecretString,
    /// One-time password for tenants enforcing TFA.
    pub otp: Option<SecretString>,
    /// Resolved after a successful login; empty before.
    pub user_id: Option<String>,
    pub session: Option<SessionCookies>,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        tenant: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            username: username.into(),
            tenant: tenant.into(),
            password,
            otp: None,
            user_id: None,
            session: None,
        }
    }

    pub fn with_otp(mut self, otp: SecretString) -> Self {
        self.otp = Some(otp);
        self
    }

    /// True unless username, tenant and password are all empty.
    pub fn is_valid(&self) -> bool {
        !(self.username.is_empty()
            && self.tenant.is_empty()
            && self.password.expose_secret().is_empty())
    }

    /// Resolve the tenant into a base URL.
    ///
    /// A bare host gets `https://`; anything without a host is rejected
    /// before a single request goes out.
    pub fn tenant_url(&self) -> Result<Url, Error> {
        tenant_url(&self.tenant)
    }
}

/// Parse a tenant address into a base URL with a trailing slash.
pub fn tenant_url(raw: &str) -> Result<Url, Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidTenantUrl("tenant is empty".into()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let mut url =
        Url::parse(&candidate).map_err(|e| Error::InvalidTenantUrl(format!("{raw}: {e}")))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidTenantUrl(format!("{raw}: missing host")));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

// ── Strategy selection & decoration ─────────────────────────────────

/// How outgoing requests are authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `Authorization: Basic base64(user:password)`.
    Basic,
    /// Session cookies plus anti-forgery header.
    OAuthInternal,
}

impl AuthStrategy {
    /// Pick the decoration for the advertised login option type.
    ///
    /// Without an explicit `BASIC` / `OAUTH2_INTERNAL` type, cookie-based
    /// decoration wins when both session cookies are present.
    pub fn select(option_type: Option<&LoginOptionType>, credentials: &Credentials) -> Self {
        match option_type {
            Some(LoginOptionType::Basic) => Self::Basic,
            Some(LoginOptionType::OAuth2Internal) => Self::OAuthInternal,
            Some(LoginOptionType::Other(_)) | None => {
                if credentials.session.is_some() {
                    Self::OAuthInternal
                } else {
                    Self::Basic
                }
            }
        }
    }

    /// Build the headers this strategy attaches to every request.
    pub fn headers(self, credentials: &Credentials) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        match self {
            Self::Basic => {
                let raw = format!(
                    "{}:{}",
                    credentials.username,
                    credentials.password.expose_secret()
                );
                let value = format!("Basic {}", STANDARD.encode(raw));
                headers.insert(AUTHORIZATION, sensitive(&value)?);
            }
            Self::OAuthInternal => {
                if let Some(ref session) = credentials.session {
                    let cookie = format!(
                        "{AUTHORIZATION_COOKIE}={}; {XSRF_COOKIE}={}",
                        session.authorization.value, session.xsrf_token.value
                    );
                    headers.insert(COOKIE, sensitive(&cookie)?);
                    headers.insert(
                        HeaderName::from_static("x-xsrf-token"),
                        sensitive(&session.xsrf_token.value)?,
                    );
                }
                headers.insert(
                    HeaderName::from_static("usexbasic"),
                    HeaderValue::from_static("true"),
                );
            }
        }
        Ok(headers)
    }
}

fn sensitive(value: &str) -> Result<HeaderValue, Error> {
    let mut header = HeaderValue::from_str(value).map_err(|e| Error::LoginFailed {
        message: format!("credential not representable as header: {e}"),
    })?;
    header.set_sensitive(true);
    Ok(header)
}
