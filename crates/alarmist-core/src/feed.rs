// ── Alarm feed ──
//
// Drives one paginated alarm list: owns the filter and the page cache,
// issues fetches one at a time, and discards responses that belong to a
// filter that is no longer active. The cache lock is never held across
// an await; every fetch captures the cache epoch before suspending.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alarmist_api::{
    Alarm, AlarmQuery, AlarmStatus, PageStatistics, RetryPolicy, retry_until_cancelled,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::filter::AlarmFilter;
use crate::pagination::{Epoch, PaginatedCache, Reload};
use crate::source::AlarmSource;

/// Default number of alarms requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Which list a feed backs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    /// All alarms matching the filter.
    All,
    /// Alarms of one device. Shows active alarms unless the filter names
    /// statuses itself; the filter's device name is ignored.
    Device { source_id: String },
    /// Alarms matching the user's saved subscription filter.
    Subscribed,
}

/// Result of one [`AlarmFeed::fetch_next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was stored; redraw as indicated.
    Applied(Reload),
    /// The filter changed while the fetch was in flight; nothing stored.
    Discarded,
    /// No further pages.
    Exhausted,
    /// Another fetch for this feed is still running.
    InFlight,
    /// The feed was closed.
    Cancelled,
}

/// Point-in-time copy of a feed's contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub alarms: Vec<Alarm>,
    /// Rows the list should show, loaded or not.
    pub row_count: usize,
    pub statistics: Option<PageStatistics>,
}

/// Outcome of resolving the filter's device name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeviceResolution {
    NotNeeded,
    Pending(String),
    Resolved(String),
    NoMatch,
}

struct FeedState {
    cache: PaginatedCache<Alarm>,
    filter: AlarmFilter,
    device: DeviceResolution,
    /// Epoch of the fetch currently running, if any.
    in_flight: Option<Epoch>,
}

/// Paginated alarm list bound to one [`AlarmSource`].
pub struct AlarmFeed<S> {
    source: Arc<S>,
    kind: FeedKind,
    page_size: u32,
    retry: RetryPolicy,
    state: Mutex<FeedState>,
    cancel: CancellationToken,
}

impl<S: AlarmSource> AlarmFeed<S> {
    pub fn new(source: Arc<S>, kind: FeedKind, filter: AlarmFilter) -> Self {
        let device = device_resolution(&kind, &filter);
        Self {
            source,
            kind,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::none(),
            state: Mutex::new(FeedState {
                cache: PaginatedCache::new(),
                filter,
                device,
                in_flight: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Retry policy for status changes. List fetches are never retried.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn kind(&self) -> &FeedKind {
        &self.kind
    }

    pub fn filter(&self) -> AlarmFilter {
        self.lock().filter.clone()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Loading ─────────────────────────────────────────────────────

    /// Discard everything and load the first page.
    pub async fn reload(&self) -> Result<FetchOutcome, CoreError> {
        {
            let mut state = self.lock();
            state.cache.reset();
            state.device = device_resolution(&self.kind, &state.filter);
        }
        self.fetch_next().await
    }

    /// Replace the filter and reload.
    pub async fn set_filter(&self, filter: AlarmFilter) -> Result<FetchOutcome, CoreError> {
        self.lock().filter = filter;
        self.reload().await
    }

    /// Fetch the next page, if one is due and none is running.
    ///
    /// A failed fetch leaves the loaded pages untouched and is not retried.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, CoreError> {
        let (epoch, filter, device) = {
            let mut state = self.lock();
            if self.cancel.is_cancelled() {
                return Ok(FetchOutcome::Cancelled);
            }
            let epoch = state.cache.epoch();
            if state.in_flight == Some(epoch) {
                return Ok(FetchOutcome::InFlight);
            }
            if !state.cache.should_load_more_pages() {
                return Ok(FetchOutcome::Exhausted);
            }
            state.in_flight = Some(epoch);
            (epoch, state.filter.clone(), state.device.clone())
        };
        let _guard = InFlightGuard {
            state: &self.state,
            epoch,
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!("feed closed while fetching");
                Ok(FetchOutcome::Cancelled)
            }
            result = self.fetch_page(epoch, &filter, device) => result,
        }
    }

    async fn fetch_page(
        &self,
        epoch: Epoch,
        filter: &AlarmFilter,
        device: DeviceResolution,
    ) -> Result<FetchOutcome, CoreError> {
        let source = match device {
            DeviceResolution::NotNeeded => match self.kind {
                FeedKind::Device { ref source_id } => Some(source_id.clone()),
                FeedKind::All | FeedKind::Subscribed => None,
            },
            DeviceResolution::Resolved(id) => Some(id),
            DeviceResolution::NoMatch => return Ok(self.apply_empty(epoch)),
            DeviceResolution::Pending(name) => match self.resolve_device(epoch, &name).await? {
                Some(id) => Some(id),
                None => return Ok(self.apply_empty(epoch)),
            },
        };

        let query = self.query_for(filter, source);
        let page = self.lock().cache.next_page_number();

        let collection = self
            .source
            .list_alarms(&query, page, self.page_size)
            .await
            .inspect_err(|e| warn!(page, error = %e, "alarm page fetch failed"))?;

        let mut state = self.lock();
        match state
            .cache
            .apply_fetch(epoch, collection.statistics, collection.alarms)
        {
            Some(reload) => {
                debug!(page, total = state.cache.total_count(), "alarm page applied");
                Ok(FetchOutcome::Applied(reload))
            }
            None => {
                warn!(page, "alarm page arrived after reset, discarded");
                Ok(FetchOutcome::Discarded)
            }
        }
    }

    /// Look up the filter's device name. `None` when no device matches.
    async fn resolve_device(&self, epoch: Epoch, name: &str) -> Result<Option<String>, CoreError> {
        let found = self.source.find_device_by_name(name).await?;
        let resolution = match found {
            Some(device) => DeviceResolution::Resolved(device.id),
            None => {
                info!(name, "no device matches filter");
                DeviceResolution::NoMatch
            }
        };

        let mut state = self.lock();
        if state.cache.epoch() == epoch {
            state.device = resolution.clone();
        }
        Ok(match resolution {
            DeviceResolution::Resolved(id) => Some(id),
            _ => None,
        })
    }

    /// Show an empty list without asking the server.
    fn apply_empty(&self, epoch: Epoch) -> FetchOutcome {
        let empty = PageStatistics {
            current_page: Some(1),
            total_pages: Some(0),
            total_elements: Some(0),
            page_size: Some(self.page_size),
        };
        match self.lock().cache.apply_fetch(epoch, Some(empty), Vec::new()) {
            Some(reload) => FetchOutcome::Applied(reload),
            None => FetchOutcome::Discarded,
        }
    }

    fn query_for(&self, filter: &AlarmFilter, source: Option<String>) -> AlarmQuery {
        let mut query = filter.to_query(source);
        if matches!(self.kind, FeedKind::Device { .. }) && query.statuses.is_empty() {
            query.statuses = vec![AlarmStatus::Active];
        }
        query
    }

    /// Fetch the next page when any of `indices` is a placeholder row.
    pub async fn prefetch(&self, indices: &[usize]) -> Result<Option<FetchOutcome>, CoreError> {
        let wanted = {
            let state = self.lock();
            indices.iter().any(|&i| state.cache.is_placeholder_index(i))
        };
        if wanted {
            self.fetch_next().await.map(Some)
        } else {
            Ok(None)
        }
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Move one alarm to `status`, then reload the whole list.
    ///
    /// The list is rebuilt rather than patched: under an active filter the
    /// alarm may drop out of the result set.
    pub async fn change_status(
        &self,
        alarm_id: &str,
        status: AlarmStatus,
    ) -> Result<FetchOutcome, CoreError> {
        let source = &self.source;
        let updated = retry_until_cancelled(
            &self.cancel,
            self.retry,
            |e: &alarmist_api::Error, _| e.is_transient(),
            move || source.update_alarm_status(alarm_id, status),
        )
        .await?;
        info!(id = %updated.id, status = %updated.status, "alarm status changed");
        self.reload().await
    }

    /// Cancel in-flight work; later fetches return [`FetchOutcome::Cancelled`].
    pub fn close(&self) {
        self.cancel.cancel();
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Rows to display: the server total, never less than what is loaded.
    pub fn row_count(&self) -> usize {
        let state = self.lock();
        state.cache.total_count().max(state.cache.current_count())
    }

    pub fn has_items(&self) -> bool {
        !self.lock().cache.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.lock().cache.current_count()
    }

    pub fn item_at(&self, index: usize) -> Option<Alarm> {
        self.lock().cache.item_at(index).cloned()
    }

    pub fn is_placeholder_index(&self, index: usize) -> bool {
        self.lock().cache.is_placeholder_index(index)
    }

    pub fn has_more(&self) -> bool {
        self.lock().cache.should_load_more_pages()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        FeedSnapshot {
            alarms: state.cache.iter().cloned().collect(),
            row_count: state.cache.total_count().max(state.cache.current_count()),
            statistics: state.cache.statistics(),
        }
    }
}

impl<S> Drop for AlarmFeed<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn device_resolution(kind: &FeedKind, filter: &AlarmFilter) -> DeviceResolution {
    match (kind, filter.device_name()) {
        (FeedKind::Device { .. }, _) | (_, None) => DeviceResolution::NotNeeded,
        (_, Some(name)) => DeviceResolution::Pending(name.to_owned()),
    }
}

/// Clears the in-flight marker when the fetch finishes or is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<FeedState>,
    epoch: Epoch,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight == Some(self.epoch) {
            state.in_flight = None;
        }
    }
}
