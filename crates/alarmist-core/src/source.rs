// ── Alarm data source seam ──
//
// The feed, dashboard and push resolver only need a handful of queries.
// `PlatformClient` implements them over HTTP; tests substitute an
// in-memory source.

use std::future::Future;
use std::sync::Arc;

use alarmist_api::{
    Alarm, AlarmCollection, AlarmQuery, AlarmStatus, Error, ManagedObject, PlatformClient,
};

/// Read and status-mutation access to alarms and the device registry.
pub trait AlarmSource: Send + Sync {
    /// One page (1-based) of alarms matching `query`.
    fn list_alarms(
        &self,
        query: &AlarmQuery,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<AlarmCollection, Error>> + Send;

    fn count_alarms(&self, query: &AlarmQuery) -> impl Future<Output = Result<u64, Error>> + Send;

    fn get_alarm(&self, id: &str) -> impl Future<Output = Result<Alarm, Error>> + Send;

    fn update_alarm_status(
        &self,
        id: &str,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<Alarm, Error>> + Send;

    fn find_device_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ManagedObject>, Error>> + Send;

    fn resolve_external_id(
        &self,
        id_type: &str,
        external_id: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}

impl AlarmSource for PlatformClient {
    fn list_alarms(
        &self,
        query: &AlarmQuery,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<AlarmCollection, Error>> + Send {
        PlatformClient::list_alarms(self, query, page, page_size)
    }

    fn count_alarms(&self, query: &AlarmQuery) -> impl Future<Output = Result<u64, Error>> + Send {
        PlatformClient::count_alarms(self, query)
    }

    fn get_alarm(&self, id: &str) -> impl Future<Output = Result<Alarm, Error>> + Send {
        PlatformClient::get_alarm(self, id)
    }

    fn update_alarm_status(
        &self,
        id: &str,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<Alarm, Error>> + Send {
        PlatformClient::update_alarm_status(self, id, status)
    }

    fn find_device_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ManagedObject>, Error>> + Send {
        PlatformClient::find_device_by_name(self, name)
    }

    fn resolve_external_id(
        &self,
        id_type: &str,
        external_id: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send {
        PlatformClient::resolve_external_id(self, id_type, external_id)
    }
}

impl<S: AlarmSource> AlarmSource for Arc<S> {
    fn list_alarms(
        &self,
        query: &AlarmQuery,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<AlarmCollection, Error>> + Send {
        S::list_alarms(self, query, page, page_size)
    }

    fn count_alarms(&self, query: &AlarmQuery) -> impl Future<Output = Result<u64, Error>> + Send {
        S::count_alarms(self, query)
    }

    fn get_alarm(&self, id: &str) -> impl Future<Output = Result<Alarm, Error>> + Send {
        S::get_alarm(self, id)
    }

    fn update_alarm_status(
        &self,
        id: &str,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<Alarm, Error>> + Send {
        S::update_alarm_status(self, id, status)
    }

    fn find_device_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ManagedObject>, Error>> + Send {
        S::find_device_by_name(self, name)
    }

    fn resolve_external_id(
        &self,
        id_type: &str,
        external_id: &str,
    ) -> impl Future<Output = Result<String, Error>> + Send {
        S::resolve_external_id(self, id_type, external_id)
    }
}
