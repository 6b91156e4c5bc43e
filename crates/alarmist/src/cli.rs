//! Clap derive structures for the `alarmist` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::path::PathBuf;

use alarmist_api::{AlarmSeverity, AlarmStatus};
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// alarmist -- browse and manage IoT platform alarms from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "alarmist",
    version,
    about = "Browse and manage IoT platform alarms from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Tenant address (e.g. acme.example.com)
    #[arg(long, short = 't', env = "ALARMIST_TENANT", global = true)]
    pub tenant: Option<String>,

    /// Username to log in with
    #[arg(long, short = 'u', env = "ALARMIST_USERNAME", global = true)]
    pub username: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "ALARMIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "ALARMIST_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Alarms requested per page
    #[arg(long, global = true)]
    pub page_size: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in to a tenant and remember the session
    Login(LoginArgs),

    /// Forget the stored session (username and tenant are kept)
    Logout,

    /// Show the remembered user and whether the session is usable
    Whoami,

    /// List and manage alarms
    #[command(alias = "a")]
    Alarms(AlarmsArgs),

    /// Resolve a push notification payload to what it points at
    Open(OpenArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// One-time password for tenants enforcing two-factor authentication
    #[arg(long)]
    pub otp: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, default_value = "ALARMIST_PASSWORD")]
    pub password_env: String,
}

// ── Alarms ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlarmsArgs {
    #[command(subcommand)]
    pub command: AlarmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlarmsCommand {
    /// List alarms matching a filter
    #[command(alias = "ls")]
    List(ListArgs),

    /// Alarms of one device (active only unless --status is given)
    Device {
        /// Managed object id of the device
        device_id: String,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Alarms for the subscription filter saved in the config file
    Subscribed {
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Save the filter used by `alarms subscribed`
    Subscribe {
        /// Exact device name to restrict the subscription to
        #[arg(long)]
        device: Option<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show one alarm
    Get {
        /// Alarm id
        id: String,
    },

    /// Acknowledge, clear or reactivate an alarm
    SetStatus {
        /// Alarm id
        id: String,
        /// New status
        status: StatusArg,
    },

    /// Active alarm counts per severity
    Summary {
        /// Restrict the counts to one device
        #[arg(long)]
        device: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Restrict to the device with this exact name
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub paging: PagingArgs,
}

/// Shared alarm filter flags.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Severities to include (repeatable or comma-separated)
    #[arg(long, short = 's', value_delimiter = ',')]
    pub severity: Vec<SeverityArg>,

    /// Statuses to include (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<StatusArg>,

    /// Text the alarm message must contain
    #[arg(long)]
    pub text: Option<String>,

    /// Only alarms raised at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Only alarms raised before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

/// How much of the list to load.
#[derive(Debug, Args)]
pub struct PagingArgs {
    /// Number of pages to load
    #[arg(long, default_value = "1", conflicts_with = "all")]
    pub pages: u32,

    /// Load every page
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SeverityArg {
    Critical,
    Major,
    Minor,
    Warning,
}

impl From<SeverityArg> for AlarmSeverity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Critical => Self::Critical,
            SeverityArg::Major => Self::Major,
            SeverityArg::Minor => Self::Minor,
            SeverityArg::Warning => Self::Warning,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Acknowledged,
    Cleared,
}

impl From<StatusArg> for AlarmStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Active => Self::Active,
            StatusArg::Acknowledged => Self::Acknowledged,
            StatusArg::Cleared => Self::Cleared,
        }
    }
}

// ── Push payloads ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OpenArgs {
    /// JSON payload file, or `-` for stdin
    pub payload: PathBuf,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
