// ── Paginated item cache ──
//
// Append-only view over a server-paginated collection, addressed by flat
// index. Pages are keyed by their 1-based number and replaced wholesale.
// Indices past the loaded data but within the server total are
// placeholders: a consumer renders them as "loading" and asks the feed for
// the next page.

use std::collections::BTreeMap;
use std::ops::Range;

use alarmist_api::PageStatistics;
use tracing::{debug, trace};

/// What a consumer has to redraw after a page was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reload {
    /// Everything: the first page after a reset also changes header state.
    Full,
    /// Only these flat indices went from placeholder to real data.
    Rows(Range<usize>),
}

/// Generation counter captured by in-flight fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

/// Page cache for one list.
///
/// Pure data structure: it never issues requests. Fetch results are applied
/// through [`apply_fetch`](Self::apply_fetch), which discards results
/// issued before the latest [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct PaginatedCache<T> {
    pages: BTreeMap<u32, Vec<T>>,
    statistics: Option<PageStatistics>,
    current_count: usize,
    epoch: Epoch,
    /// Set once a page past the first comes back empty.
    exhausted: bool,
}

impl<T> Default for PaginatedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PaginatedCache<T> {
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
            statistics: None,
            current_count: 0,
            epoch: Epoch::default(),
            exhausted: false,
        }
    }

    /// Drop all pages and statistics and start a new epoch.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.statistics = None;
        self.current_count = 0;
        self.exhausted = false;
        self.epoch = Epoch(self.epoch.0.wrapping_add(1));
        debug!(epoch = self.epoch.0, "pagination cache reset");
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    // ── Fetch sequencing ────────────────────────────────────────────

    /// Whether another page may exist.
    ///
    /// True before the first fetch, and while `currentPage <= totalPages`.
    /// Checked with the page number of the last response, so one request
    /// past the end can happen; the empty page it yields stops further
    /// loading.
    pub fn should_load_more_pages(&self) -> bool {
        if self.exhausted {
            return false;
        }
        match self.statistics {
            None => true,
            Some(stats) => match (stats.current_page, stats.total_pages) {
                (Some(current), Some(total)) => current <= total,
                _ => true,
            },
        }
    }

    /// Page to request next: the last served page + 1, or 1.
    pub fn next_page_number(&self) -> u32 {
        self.statistics
            .and_then(|s| s.current_page)
            .map_or(1, |current| current.saturating_add(1))
    }

    /// Insert or replace `page_number` wholesale.
    ///
    /// Page numbers are 1-based; a 0 is stored as page 1.
    pub fn append_page(&mut self, page_number: u32, items: Vec<T>) {
        let page_number = page_number.max(1);
        let added = items.len();
        if let Some(previous) = self.pages.insert(page_number, items) {
            self.current_count -= previous.len();
        }
        self.current_count += added;
        trace!(page_number, added, total = self.current_count, "page stored");
    }

    /// Record the statistics of the last response.
    pub fn set_statistics(&mut self, statistics: PageStatistics) {
        self.statistics = Some(statistics);
    }

    /// Apply a fetch issued at `epoch`.
    ///
    /// Returns `None` (and leaves the cache untouched) when the cache was
    /// reset after the fetch was issued. Items are stored under the page
    /// number the server reports; without one, under the page that was
    /// due when the response arrived.
    pub fn apply_fetch(
        &mut self,
        epoch: Epoch,
        statistics: Option<PageStatistics>,
        items: Vec<T>,
    ) -> Option<Reload> {
        if epoch != self.epoch {
            debug!(
                issued = epoch.0,
                current = self.epoch.0,
                "discarding stale page"
            );
            return None;
        }

        let page = statistics
            .and_then(|s| s.current_page)
            .unwrap_or_else(|| self.next_page_number())
            .max(1);

        let mut stats = statistics.unwrap_or_else(|| self.statistics.unwrap_or_default());
        stats.current_page = Some(page);
        self.set_statistics(stats);

        if items.is_empty() && page > 1 {
            self.exhausted = true;
        }

        let added = items.len();
        self.append_page(page, items);

        if page == 1 {
            Some(Reload::Full)
        } else {
            Some(Reload::Rows(self.refresh_range(added)))
        }
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn statistics(&self) -> Option<PageStatistics> {
        self.statistics
    }

    /// Items held across all cached pages.
    pub fn current_count(&self) -> usize {
        self.current_count
    }

    /// Last-seen server total; the loaded count while unknown.
    pub fn total_count(&self) -> usize {
        self.statistics
            .and_then(|s| s.total_elements)
            .map_or(self.current_count, |total| {
                usize::try_from(total).unwrap_or(usize::MAX)
            })
    }

    pub fn is_empty(&self) -> bool {
        self.current_count == 0
    }

    /// Item at `flat_index` in page order, then in-page order.
    pub fn item_at(&self, flat_index: usize) -> Option<&T> {
        if flat_index >= self.current_count {
            return None;
        }
        let mut offset = flat_index;
        for items in self.pages.values() {
            if offset < items.len() {
                return items.get(offset);
            }
            offset -= items.len();
        }
        None
    }

    /// True for indices beyond the loaded data.
    pub fn is_placeholder_index(&self, flat_index: usize) -> bool {
        flat_index >= self.current_count
    }

    /// Flat indices occupied by `new_items`, the page that was just appended.
    pub fn indices_to_refresh(&self, new_items: &[T]) -> Range<usize> {
        self.refresh_range(new_items.len())
    }

    fn refresh_range(&self, added: usize) -> Range<usize> {
        self.current_count.saturating_sub(added)..self.current_count
    }

    /// All loaded items in flat order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pages.values().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn stats(current: u32, total_pages: u32, total_elements: u64) -> PageStatistics {
        PageStatistics {
            current_page: Some(current),
            total_pages: Some(total_pages),
            total_elements: Some(total_elements),
            page_size: Some(50),
        }
    }

    fn items(start: u32, len: u32) -> Vec<u32> {
        (start..start + len).collect()
    }

    #[test]
    fn fresh_cache_wants_page_one() {
        let cache = PaginatedCache::<u32>::new();
        assert!(cache.should_load_more_pages());
        assert_eq!(cache.next_page_number(), 1);
        assert_eq!(cache.current_count(), 0);
        assert!(cache.item_at(0).is_none());
        assert!(cache.is_placeholder_index(0));
    }

    #[test]
    fn disjoint_pages_flatten_in_page_order() {
        let mut cache = PaginatedCache::new();
        cache.append_page(3, items(300, 2));
        cache.append_page(1, items(100, 3));
        cache.append_page(2, items(200, 1));

        assert_eq!(cache.current_count(), 6);
        let flat: Vec<u32> = cache.iter().copied().collect();
        assert_eq!(flat, vec![100, 101, 102, 200, 300, 301]);
        assert_eq!(cache.item_at(3), Some(&200));
        assert_eq!(cache.item_at(5), Some(&301));
        assert_eq!(cache.item_at(6), None);
    }

    #[test]
    fn replacing_a_page_keeps_count_consistent() {
        let mut cache = PaginatedCache::new();
        cache.append_page(1, items(0, 50));
        cache.append_page(1, items(0, 10));
        assert_eq!(cache.current_count(), 10);
        assert_eq!(cache.iter().count(), 10);
    }

    #[test]
    fn reset_empties_everything_and_advances_epoch() {
        let mut cache = PaginatedCache::new();
        cache.append_page(1, items(0, 5));
        cache.set_statistics(stats(1, 2, 7));
        let before = cache.epoch();

        cache.reset();

        assert_eq!(cache.current_count(), 0);
        assert_eq!(cache.total_count(), 0);
        assert!(cache.item_at(0).is_none());
        assert!(cache.statistics().is_none());
        assert!(cache.epoch() > before);
        assert_eq!(cache.next_page_number(), 1);
    }

    #[test]
    fn placeholder_iff_beyond_loaded() {
        let mut cache = PaginatedCache::new();
        cache.append_page(1, items(0, 50));
        cache.set_statistics(stats(1, 3, 120));

        assert!(!cache.is_placeholder_index(0));
        assert!(!cache.is_placeholder_index(49));
        assert!(cache.is_placeholder_index(50));
        assert!(cache.is_placeholder_index(119));
        assert_eq!(cache.total_count(), 120);
    }

    #[test]
    fn second_page_refreshes_exactly_its_rows() {
        let mut cache = PaginatedCache::new();
        let epoch = cache.epoch();
        assert_eq!(
            cache.apply_fetch(epoch, Some(stats(1, 3, 120)), items(0, 50)),
            Some(Reload::Full)
        );

        assert!(cache.should_load_more_pages());
        assert_eq!(cache.next_page_number(), 2);

        let page_two = items(50, 20);
        cache.append_page(2, page_two.clone());
        cache.set_statistics(stats(2, 3, 120));
        assert_eq!(cache.current_count(), 70);
        assert_eq!(cache.indices_to_refresh(&page_two), 50..70);
    }

    #[test]
    fn apply_fetch_returns_row_range_for_later_pages() {
        let mut cache = PaginatedCache::new();
        let epoch = cache.epoch();
        cache.apply_fetch(epoch, Some(stats(1, 3, 70)), items(0, 50));

        let reload = cache.apply_fetch(epoch, Some(stats(2, 3, 70)), items(50, 20));

        assert_eq!(reload, Some(Reload::Rows(50..70)));
        assert_eq!(cache.current_count(), 70);
    }

    #[test]
    fn stale_fetch_is_discarded() {
        let mut cache = PaginatedCache::new();
        let issued = cache.epoch();
        cache.reset();
        cache.append_page(1, items(900, 2));

        let reload = cache.apply_fetch(issued, Some(stats(1, 1, 50)), items(0, 50));

        assert_eq!(reload, None);
        assert_eq!(cache.current_count(), 2);
        assert_eq!(cache.item_at(0), Some(&900));
        assert!(cache.statistics().is_none());
    }

    #[test]
    fn one_fetch_past_the_end_is_tolerated() {
        let mut cache = PaginatedCache::new();
        let epoch = cache.epoch();
        cache.apply_fetch(epoch, Some(stats(1, 1, 3)), items(0, 3));

        // currentPage (1) <= totalPages (1): the guard still allows page 2.
        assert!(cache.should_load_more_pages());
        assert_eq!(cache.next_page_number(), 2);

        let reload = cache.apply_fetch(epoch, Some(stats(2, 1, 3)), Vec::new());
        assert_eq!(reload, Some(Reload::Rows(3..3)));
        assert!(!cache.should_load_more_pages());
        assert_eq!(cache.current_count(), 3);
    }

    #[test]
    fn missing_statistics_fall_back_to_due_page() {
        let mut cache = PaginatedCache::new();
        let epoch = cache.epoch();
        cache.apply_fetch(epoch, None, items(0, 5));
        assert_eq!(cache.next_page_number(), 2);

        let reload = cache.apply_fetch(epoch, None, items(5, 5));
        assert_eq!(reload, Some(Reload::Rows(5..10)));
        assert_eq!(cache.total_count(), 10);
    }

    #[test]
    fn total_without_total_elements_is_the_loaded_count() {
        let mut cache = PaginatedCache::new();
        let epoch = cache.epoch();
        let statistics = PageStatistics {
            total_elements: None,
            ..stats(1, 3, 0)
        };
        cache.apply_fetch(epoch, Some(statistics), items(0, 4));

        assert_eq!(cache.total_count(), 4);
        assert!(!cache.is_placeholder_index(3));
        assert!(cache.is_placeholder_index(4));
    }

    #[test]
    fn empty_first_page_is_a_full_reload() {
        let mut cache = PaginatedCache::<u32>::new();
        let epoch = cache.epoch();
        let reload = cache.apply_fetch(epoch, Some(stats(1, 0, 0)), Vec::new());
        assert_eq!(reload, Some(Reload::Full));
        assert!(cache.is_empty());
        assert!(!cache.should_load_more_pages());
    }
}
