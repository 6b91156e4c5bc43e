//! Async Rust client for the alarm, inventory and session endpoints of an
//! IoT device-management platform.
//!
//! - **[`PlatformClient`]**: tenant-scoped HTTP client. Endpoint groups
//!   (login, alarms, inventory) are inherent methods split across modules.
//! - **[`AuthStrategy`]**: request decoration, either HTTP Basic or the
//!   internal-OAuth session cookie pair plus anti-forgery header.
//! - **[`retry()`]**: bounded sequential retry with cooperative cancellation.
//! - **[`first_value`]**: adapts a multi-valued producer to a single result.

pub mod alarms;
pub mod auth;
pub mod client;
pub mod error;
pub mod inventory;
pub mod login;
pub mod retry;
pub mod single;
pub mod transport;
pub mod types;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alarms::AlarmQuery;
pub use auth::{
    AuthStrategy, Credentials, LoginOption, LoginOptionType, SessionCookie, SessionCookies,
    tenant_url,
};
pub use client::PlatformClient;
pub use error::{Cancelled, Error, NoOutput};
pub use inventory::DEFAULT_EXTERNAL_ID_TYPE;
pub use login::select_login_option;
pub use retry::{RetryPolicy, retry, retry_until_cancelled};
pub use single::first_value;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    Alarm, AlarmCollection, AlarmComment, AlarmSeverity, AlarmStatus, CurrentUser, ManagedObject,
    PageStatistics, SourceRef,
};
