//! Command dispatch: bridges CLI args -> session / feeds -> output formatting.

pub mod alarms;
pub mod open;
pub mod session;
pub mod util;

use alarmist_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a tenant-bound command to its handler.
pub async fn dispatch(cmd: Command, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let session = config::open_session(cfg);
    match cmd {
        Command::Login(args) => session::login(&session, args, cfg, global).await,
        Command::Logout => session::logout(&session, global).await,
        Command::Whoami => session::whoami(&session, global).await,
        Command::Alarms(args) => alarms::handle(&session, args, cfg, global).await,
        Command::Open(args) => open::handle(&session, args, cfg, global).await,
        // Handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
