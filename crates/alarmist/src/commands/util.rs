//! Shared helpers for command handlers.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use alarmist_api::PlatformClient;
use alarmist_core::AlarmFilter;
use chrono::{DateTime, NaiveDate, Utc};

use crate::cli::FilterArgs;
use crate::config::CliSession;
use crate::error::CliError;

/// Restore the stored session and hand out its client.
pub async fn restored_client(session: &CliSession) -> Result<Arc<PlatformClient>, CliError> {
    if !session.restore().await? {
        return Err(CliError::NotLoggedIn);
    }
    Ok(session.client()?)
}

/// Build an alarm filter from command-line flags.
pub fn filter_from_args(
    args: &FilterArgs,
    device_name: Option<String>,
) -> Result<AlarmFilter, CliError> {
    let mut filter = AlarmFilter {
        device_name,
        text: args.text.clone(),
        date_from: args.from.as_deref().map(|raw| parse_time("from", raw)).transpose()?,
        date_to: args.to.as_deref().map(|raw| parse_time("to", raw)).transpose()?,
        ..AlarmFilter::default()
    };
    for &severity in &args.severity {
        filter = filter.with_severity(severity.into());
    }
    for &status in &args.status {
        filter = filter.with_status(status.into());
    }
    Ok(filter)
}

/// RFC 3339 timestamp, or a bare date meaning midnight UTC.
pub fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>, CliError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
        .ok_or_else(|| CliError::Validation {
            field: field.into(),
            reason: format!("expected RFC 3339 or YYYY-MM-DD, got '{raw}'"),
        })
}

/// Read a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        Ok(raw)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_timestamps() {
        assert_eq!(
            parse_time("from", "2024-03-01").unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
        assert_eq!(
            parse_time("from", "2024-03-01T10:00:00+01:00")
                .unwrap()
                .to_rfc3339(),
            "2024-03-01T09:00:00+00:00"
        );
        assert!(matches!(
            parse_time("to", "yesterday"),
            Err(CliError::Validation { .. })
        ));
    }
}
