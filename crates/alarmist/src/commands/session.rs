//! Login, logout and session inspection.

use alarmist_api::Credentials;
use alarmist_config::Config;
use secrecy::SecretString;
use serde::Serialize;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, CliSession};
use crate::error::CliError;
use crate::output;

pub async fn login(
    session: &CliSession,
    args: LoginArgs,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let remembered = session.preferences().await?;
    let (tenant, username) = config::login_target(cfg, remembered.as_ref(), global)?;

    let password = match std::env::var(&args.password_env) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password(format!("Password for {username}@{tenant}: "))?,
    };

    let mut credentials = Credentials::new(username, tenant, SecretString::from(password));
    if let Some(otp) = args.otp {
        credentials = credentials.with_otp(SecretString::from(otp));
    }

    let user_id = session.login(credentials).await?;
    if !global.quiet {
        eprintln!("Logged in as {user_id}");
    }
    Ok(())
}

pub async fn logout(session: &CliSession, global: &GlobalOpts) -> Result<(), CliError> {
    session.logout().await?;
    if !global.quiet {
        eprintln!("Logged out");
    }
    Ok(())
}

#[derive(Serialize)]
struct WhoAmI {
    username: String,
    tenant: String,
    user_id: Option<String>,
    session: &'static str,
}

pub async fn whoami(session: &CliSession, global: &GlobalOpts) -> Result<(), CliError> {
    let Some(prefs) = session.preferences().await? else {
        return Err(CliError::NotLoggedIn);
    };
    let restored = session.restore().await?;

    let info = WhoAmI {
        username: prefs.username,
        tenant: prefs.tenant,
        user_id: prefs.user_id,
        session: if restored { "active" } else { "expired" },
    };
    let out = output::render_single(
        &global.output,
        &info,
        |i| {
            [
                format!("User:     {}", i.username),
                format!("Tenant:   {}", i.tenant),
                format!("User ID:  {}", i.user_id.as_deref().unwrap_or("-")),
                format!("Session:  {}", i.session),
            ]
            .join("\n")
        },
        |i| i.username.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
