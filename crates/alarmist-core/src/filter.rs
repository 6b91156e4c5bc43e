// ── Alarm list filter ──
//
// User-facing filter criteria. A device is named, not identified: the
// feed resolves the name through the inventory before the first page and
// passes the resulting id to `to_query`.

use std::collections::BTreeSet;

use alarmist_api::{AlarmQuery, AlarmSeverity, AlarmStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter criteria for one alarm list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmFilter {
    /// Exact device name to restrict the list to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub severities: BTreeSet<AlarmSeverity>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub statuses: BTreeSet<AlarmStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
}

impl AlarmFilter {
    pub fn with_severity(mut self, severity: AlarmSeverity) -> Self {
        self.severities.insert(severity);
        self
    }

    pub fn with_status(mut self, status: AlarmStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Device name to resolve, ignoring blank input.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Server query for this filter, restricted to `source` when given.
    ///
    /// Severity and status sets go out in canonical order (most severe
    /// first; active, acknowledged, cleared). Blank text is dropped.
    pub fn to_query(&self, source: Option<String>) -> AlarmQuery {
        AlarmQuery {
            source,
            severities: self.severities.iter().copied().collect(),
            statuses: self.statuses.iter().copied().collect(),
            text: self
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sets_are_ordered_canonically() {
        let filter = AlarmFilter::default()
            .with_severity(AlarmSeverity::Warning)
            .with_severity(AlarmSeverity::Critical)
            .with_status(AlarmStatus::Cleared)
            .with_status(AlarmStatus::Active);

        let query = filter.to_query(Some("42".into()));

        assert_eq!(
            query.severities,
            vec![AlarmSeverity::Critical, AlarmSeverity::Warning]
        );
        assert_eq!(query.statuses, vec![AlarmStatus::Active, AlarmStatus::Cleared]);
        assert_eq!(query.source.as_deref(), Some("42"));
    }

    #[test]
    fn blank_text_and_device_are_ignored() {
        let filter = AlarmFilter {
            text: Some("   ".into()),
            device_name: Some(" ".into()),
            ..AlarmFilter::default()
        };
        assert!(filter.to_query(None).text.is_none());
        assert!(filter.device_name().is_none());
    }

    #[test]
    fn serialized_form_uses_wire_names() {
        let filter = AlarmFilter::default()
            .with_device_name("Pump 7")
            .with_severity(AlarmSeverity::Major);
        let text = serde_json::to_string(&filter).unwrap();
        assert_eq!(text, r#"{"device_name":"Pump 7","severities":["MAJOR"]}"#);
        let back: AlarmFilter = serde_json::from_str(&text).unwrap();
        assert_eq!(back, filter);
    }
}
