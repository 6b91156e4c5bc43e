// ── Dashboard summary ──
//
// Active-alarm counts per severity, optionally for one device. Counts are
// queried one severity at a time; a failed count is reported as unknown
// instead of failing the whole summary.

use alarmist_api::{AlarmQuery, AlarmSeverity, AlarmStatus};
use serde::Serialize;
use tracing::warn;

use crate::error::CoreError;
use crate::source::AlarmSource;

/// Active alarms for one severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeverityCount {
    pub severity: AlarmSeverity,
    /// `None` when the count could not be fetched.
    pub count: Option<u64>,
}

/// Active-alarm counts, most severe first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlarmSummary {
    pub counts: Vec<SeverityCount>,
}

impl AlarmSummary {
    /// Count active alarms per severity, restricted to `device_id` if given.
    ///
    /// Authentication failures abort the summary; other failures only mark
    /// the affected severity as unknown.
    pub async fn fetch<S: AlarmSource>(
        source: &S,
        device_id: Option<&str>,
    ) -> Result<Self, CoreError> {
        let mut counts = Vec::with_capacity(AlarmSeverity::ALL.len());
        for severity in AlarmSeverity::ALL {
            let query = AlarmQuery {
                source: device_id.map(str::to_owned),
                severities: vec![severity],
                statuses: vec![AlarmStatus::Active],
                ..AlarmQuery::default()
            };
            let count = match source.count_alarms(&query).await {
                Ok(count) => Some(count),
                Err(err) if err.is_login_failure() => return Err(err.into()),
                Err(err) => {
                    warn!(%severity, error = %err, "alarm count failed");
                    None
                }
            };
            counts.push(SeverityCount { severity, count });
        }
        Ok(Self { counts })
    }

    /// Sum of the known counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().filter_map(|c| c.count).sum()
    }

    pub fn count_for(&self, severity: AlarmSeverity) -> Option<u64> {
        self.counts
            .iter()
            .find(|c| c.severity == severity)
            .and_then(|c| c.count)
    }
}
