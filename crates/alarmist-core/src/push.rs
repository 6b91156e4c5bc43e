// ── Push notification deep links ──
//
// A push payload carries either a complete alarm or just an identifier
// (alarm, device, or external id). Resolution turns it into the screen to
// open, fetching whatever the payload left out.

use alarmist_api::{Alarm, DEFAULT_EXTERNAL_ID_TYPE};
use serde::Deserialize;
use tracing::debug;

use crate::error::CoreError;
use crate::source::AlarmSource;

/// Decoded push payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PushNotification {
    Alarm(Box<Alarm>),
    AlarmId(String),
    DeviceId(String),
    ExternalId { external_id: String, id_type: String },
}

/// Where a notification leads.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    AlarmDetails(Box<Alarm>),
    DeviceAlarms { device_id: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped {
        alarm: Box<Alarm>,
    },
    AlarmId {
        #[serde(rename = "alarmId")]
        alarm_id: String,
    },
    Device {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
    External {
        #[serde(rename = "externalId")]
        external_id: String,
        #[serde(rename = "externalIdType", default)]
        id_type: Option<String>,
    },
    Bare(Box<Alarm>),
}

impl PushNotification {
    /// Parse a JSON payload.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let payload: Payload =
            serde_json::from_str(raw).map_err(|e| CoreError::ValidationFailed {
                message: format!("unrecognised push payload: {e}"),
            })?;
        Ok(match payload {
            Payload::Wrapped { alarm } | Payload::Bare(alarm) => Self::Alarm(alarm),
            Payload::AlarmId { alarm_id } => Self::AlarmId(alarm_id),
            Payload::Device { device_id } => Self::DeviceId(device_id),
            Payload::External {
                external_id,
                id_type,
            } => Self::ExternalId {
                external_id,
                id_type: id_type
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_EXTERNAL_ID_TYPE.to_owned()),
            },
        })
    }

    /// Turn the notification into a navigation target.
    pub async fn resolve<S: AlarmSource>(self, source: &S) -> Result<NavigationTarget, CoreError> {
        match self {
            Self::Alarm(alarm) => Ok(NavigationTarget::AlarmDetails(alarm)),
            Self::AlarmId(id) => {
                debug!(%id, "fetching alarm for push notification");
                let alarm = source.get_alarm(&id).await?;
                Ok(NavigationTarget::AlarmDetails(Box::new(alarm)))
            }
            Self::DeviceId(device_id) => Ok(NavigationTarget::DeviceAlarms { device_id }),
            Self::ExternalId {
                external_id,
                id_type,
            } => {
                debug!(%external_id, %id_type, "resolving external id");
                let device_id = source.resolve_external_id(&id_type, &external_id).await?;
                Ok(NavigationTarget::DeviceAlarms { device_id })
            }
        }
    }
}
