// Login endpoints
//
// Login option discovery, the internal-OAuth credentials exchange and the
// current-user lookup. The credentials POST never carries the client's
// request decoration: it is what produces the decoration.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::auth::{
    AUTHORIZATION_COOKIE, Credentials, LoginOption, LoginOptionType, SessionCookie,
    SessionCookies, USE_X_BASIC_HEADER, XSRF_COOKIE,
};
use crate::client::{PlatformClient, parse_error};
use crate::error::Error;
use crate::types::{CurrentUser, LoginOptionCollection};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Choose the option to log in with from the internal options.
///
/// The first OAuth-internal option shown on the login page wins; otherwise
/// the first `BASIC` option. `None` when neither exists.
pub fn select_login_option(options: &[LoginOption]) -> Option<&LoginOption> {
    options
        .iter()
        .find(|o| o.option_type == LoginOptionType::OAuth2Internal && o.visible_on_login_page)
        .or_else(|| {
            options
                .iter()
                .find(|o| o.option_type == LoginOptionType::Basic)
        })
}

impl PlatformClient {
    /// List the login options backed by the tenant's own user database.
    ///
    /// `GET /tenant/loginOptions`
    pub async fn login_options(&self) -> Result<Vec<LoginOption>, Error> {
        let collection: LoginOptionCollection = self.get("tenant/loginOptions").await?;
        let total = collection.login_options.len();
        let internal: Vec<LoginOption> = collection
            .login_options
            .into_iter()
            .filter(LoginOption::is_internal)
            .collect();
        debug!(total, internal = internal.len(), "login options received");
        Ok(internal)
    }

    /// Exchange credentials for the session cookie pair.
    ///
    /// Posts the credentials form to the option's `initRequest` and reads the
    /// `authorization` and `XSRF-TOKEN` cookies out of `Set-Cookie`. A 2xx
    /// response missing either cookie is still a failed login.
    pub async fn oauth_login(
        &self,
        credentials: &Credentials,
        option: &LoginOption,
    ) -> Result<SessionCookies, Error> {
        let init_request = option
            .init_request
            .as_deref()
            .ok_or(Error::MissingLoginOption)?;
        let url = self.base_url().join(init_request)?;

        let body = login_form(credentials);
        debug!("POST {url} (credentials form)");

        let resp = self
            .http()
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .header(USE_X_BASIC_HEADER, HeaderValue::from_static("true"))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let err = parse_error(status, resp).await;
            warn!(status = status.as_u16(), "login rejected");
            return Err(Error::LoginFailed {
                message: err.to_string(),
            });
        }

        let mut authorization = None;
        let mut xsrf_token = None;
        for cookie in resp.cookies() {
            let expires = cookie_expiry(cookie.expires(), cookie.max_age());
            let parsed = SessionCookie {
                name: cookie.name().to_owned(),
                value: cookie.value().to_owned(),
                expires,
            };
            match cookie.name() {
                AUTHORIZATION_COOKIE => authorization = Some(parsed),
                XSRF_COOKIE => xsrf_token = Some(parsed),
                _ => {}
            }
        }

        match (authorization, xsrf_token) {
            (Some(authorization), Some(xsrf_token)) => {
                info!(username = %credentials.username, "session cookies received");
                Ok(SessionCookies {
                    authorization,
                    xsrf_token,
                })
            }
            (authorization, xsrf_token) => {
                let missing: Vec<&str> = [
                    authorization.is_none().then_some(AUTHORIZATION_COOKIE),
                    xsrf_token.is_none().then_some(XSRF_COOKIE),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(Error::LoginFailed {
                    message: format!("missing session cookie(s): {}", missing.join(", ")),
                })
            }
        }
    }

    /// The user the current decoration authenticates as.
    ///
    /// `GET /user/currentUser`
    pub async fn current_user(&self) -> Result<CurrentUser, Error> {
        self.get("user/currentUser").await
    }
}

fn login_form(credentials: &Credentials) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("grant_type", "PASSWORD")
        .append_pair("username", &credentials.username)
        .append_pair("password", credentials.password.expose_secret());
    if let Some(ref otp) = credentials.otp {
        form.append_pair("tfa_code", otp.expose_secret());
    }
    form.finish()
}

fn cookie_expiry(
    expires: Option<SystemTime>,
    max_age: Option<std::time::Duration>,
) -> Option<DateTime<Utc>> {
    if let Some(age) = max_age {
        let age = chrono::Duration::from_std(age).ok()?;
        return Some(Utc::now() + age);
    }
    expires.map(DateTime::<Utc>::from)
}
