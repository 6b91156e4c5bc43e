// Inventory and identity endpoints
//
// Just enough of the device registry to turn a device name or an external
// identifier into the managed-object id the alarm API filters on.

use tracing::debug;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::types::{ExternalIdResponse, ManagedObject, ManagedObjectCollection};

/// External id type used when a push payload does not name one.
pub const DEFAULT_EXTERNAL_ID_TYPE: &str = "c8y_Serial";

/// Inventory query matching a device by exact name.
fn name_filter(name: &str) -> String {
    // OData string literals escape `'` by doubling it.
    format!("$filter=(name eq '{}')", name.replace('\'', "''"))
}

impl PlatformClient {
    /// Look a device up by exact name. `None` when nothing matches.
    ///
    /// `GET /inventory/managedObjects?query=...&pageSize=1`
    pub async fn find_device_by_name(&self, name: &str) -> Result<Option<ManagedObject>, Error> {
        let params = [("query", name_filter(name)), ("pageSize", "1".to_owned())];
        let collection: ManagedObjectCollection = self
            .get_with_params("inventory/managedObjects", &params)
            .await?;
        let device = collection.managed_objects.into_iter().next();
        debug!(name, found = device.is_some(), "device lookup by name");
        Ok(device)
    }

    /// Resolve an external identifier to a managed-object id.
    ///
    /// `GET /identity/externalIds/{type}/{id}`
    pub async fn resolve_external_id(&self, id_type: &str, external_id: &str) -> Result<String, Error> {
        let path = format!(
            "identity/externalIds/{}/{}",
            encode_segment(id_type),
            encode_segment(external_id)
        );
        let resp: ExternalIdResponse = self.get(&path).await?;
        Ok(resp.managed_object.id)
    }
}

/// Percent-encode a single path segment.
fn encode_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
