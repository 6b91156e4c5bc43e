//! Alarm list and session logic between `alarmist-api` and its front ends.
//!
//! - **[`PaginatedCache`]**: pure page cache addressed by flat index, with
//!   placeholder rows and an epoch guard against stale fetches.
//! - **[`AlarmFeed`]**: one alarm list (all, per device, subscribed) that
//!   drives a cache through an [`AlarmSource`].
//! - **[`Session`]**: login/restore/logout state machine over a
//!   [`CredentialStore`], owning the decorated [`PlatformClient`](alarmist_api::PlatformClient).
//! - **[`PushNotification`]**: push payload decoding and deep-link resolution.
//! - **[`AlarmSummary`]**: active-alarm counts per severity.

pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod feed;
pub mod filter;
pub mod pagination;
pub mod push;
pub mod session;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use credentials::{CredentialStore, MemoryCredentialStore, Preferences};
pub use dashboard::{AlarmSummary, SeverityCount};
pub use error::CoreError;
pub use feed::{AlarmFeed, DEFAULT_PAGE_SIZE, FeedKind, FeedSnapshot, FetchOutcome};
pub use filter::AlarmFilter;
pub use pagination::{Epoch, PaginatedCache, Reload};
pub use push::{NavigationTarget, PushNotification};
pub use session::{Session, SessionState};
pub use source::AlarmSource;
