//! Response and request types for the platform REST endpoints.
//!
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.
//! Enumerations tolerate values this client does not know about so a
//! single odd record never fails a whole page.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Pagination ───────────────────────────────────────────────────────

/// Statistics block returned next to every collection.
///
/// `totalPages` / `totalElements` are only present when the query asked
/// for them (`withTotalPages=true`, `withTotalElements=true`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStatistics {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

// ── Alarms ───────────────────────────────────────────────────────────

/// Alarm severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlarmSeverity {
    Critical,
    Major,
    Minor,
    Warning,
    Unknown,
}

impl AlarmSeverity {
    pub const ALL: [Self; 4] = [Self::Critical, Self::Major, Self::Minor, Self::Warning];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
            Self::Warning => "WARNING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<String> for AlarmSeverity {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "MAJOR" => Self::Major,
            "MINOR" => Self::Minor,
            "WARNING" => Self::Warning,
            _ => Self::Unknown,
        }
    }
}

impl From<AlarmSeverity> for String {
    fn from(value: AlarmSeverity) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for AlarmSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alarm lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlarmStatus {
    Active,
    Acknowledged,
    Cleared,
    Unknown,
}

impl AlarmStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Acknowledged, Self::Cleared];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Cleared => "CLEARED",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Imperative used for the action that moves an alarm into this status.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Active => "Reactivate",
            Self::Acknowledged => "Acknowledge",
            Self::Cleared => "Clear",
            Self::Unknown => "Update",
        }
    }
}

impl From<String> for AlarmStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "ACTIVE" => Self::Active,
            "ACKNOWLEDGED" => Self::Acknowledged,
            "CLEARED" => Self::Cleared,
            _ => Self::Unknown,
        }
    }
}

impl From<AlarmStatus> for String {
    fn from(value: AlarmStatus) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The device an alarm was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A comment attached to an alarm (`c8y_Comments` fragment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmComment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<String>,
}

/// Alarm record — from `GET /alarm/alarms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    #[serde(rename = "type", default)]
    pub alarm_type: String,
    #[serde(default)]
    pub text: String,
    pub severity: AlarmSeverity,
    pub status: AlarmStatus,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub source: Option<SourceRef>,
    #[serde(rename = "c8y_Comments", default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<AlarmComment>,
    /// Custom fragments not modeled above.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One page of alarms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmCollection {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(default)]
    pub statistics: Option<PageStatistics>,
}

/// Body of `PUT /alarm/alarms/{id}` for a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmStatusUpdate {
    pub status: AlarmStatus,
}

// ── Inventory & identity ─────────────────────────────────────────────

/// Managed object (device) — from `GET /inventory/managedObjects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ManagedObjectCollection {
    #[serde(default)]
    pub managed_objects: Vec<ManagedObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ManagedObjectRef {
    pub id: String,
}

/// External identifier binding — from `GET /identity/externalIds/{type}/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExternalIdResponse {
    pub managed_object: ManagedObjectRef,
}

// ── Users ────────────────────────────────────────────────────────────

/// The authenticated user — from `GET /user/currentUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginOptionCollection {
    #[serde(default)]
    pub login_options: Vec<crate::auth::LoginOption>,
}
