//! Accumulated pages of one list and the fetch guard around them.
//!
//! [`ListState`] performs no I/O. A fetch is split in two: [`ListState::begin_fetch`]
//! claims the single in-flight slot and hands out a [`FetchTicket`], and
//! [`ListState::finish_fetch`] applies the response for that ticket. Every
//! filter change starts a new generation; responses carrying an older
//! generation are dropped.

use tracing::debug;

use daftar_core::models::Entity;
use daftar_core::ports::{Cursor, EntityFilter, Page, PageRequest};

use crate::error::{ClientError, ClientResult};

/// Everything needed to issue one page request, captured when it was claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    filter: EntityFilter,
    request: PageRequest,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.request.after()
    }

    pub fn limit(&self) -> u32 {
        self.request.limit()
    }

    pub fn request(&self) -> PageRequest {
        self.request
    }
}

/// What happened to a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page was appended.
    Appended { items: usize, has_more: bool },
    /// Nothing was requested: a fetch is running or the list is exhausted.
    Skipped,
    /// The response belonged to an earlier filter and was dropped.
    Stale,
}

/// Pages loaded so far for the current filter.
#[derive(Debug, Clone)]
pub struct ListState {
    pages: Vec<Page<Entity>>,
    filter: EntityFilter,
    base: PageRequest,
    generation: u64,
    /// Generation of the running fetch, if any.
    in_flight: Option<u64>,
    last_error: Option<String>,
}

impl ListState {
    /// Empty state with a fixed page size in `[1, 100]`.
    pub fn new(page_size: u32) -> ClientResult<Self> {
        Ok(Self {
            pages: Vec::new(),
            filter: EntityFilter::default(),
            base: PageRequest::new(page_size as i64, None)?,
            generation: 0,
            in_flight: None,
            last_error: None,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    pub fn page_size(&self) -> u32 {
        self.base.limit()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pages(&self) -> &[Page<Entity>] {
        &self.pages
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True until a page without a next cursor has been appended.
    pub fn has_more(&self) -> bool {
        self.pages.last().is_none_or(Page::has_more)
    }

    /// Message of the last failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Number of items across all pages.
    pub fn total_count(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    /// Item at a flat index.
    ///
    /// Every page but the last holds exactly `page_size` items, so the page
    /// and offset follow from division.
    pub fn item_at(&self, index: usize) -> Option<&Entity> {
        let size = self.page_size() as usize;
        self.pages.get(index / size)?.items.get(index % size)
    }

    /// Items in flat order.
    pub fn items(&self) -> impl Iterator<Item = &Entity> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Switch filter. Returns false when it is unchanged.
    ///
    /// A change discards every page and orphans any running fetch.
    pub fn set_filter(&mut self, filter: EntityFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.restart();
        true
    }

    /// Change the page size; only allowed before anything is loaded.
    pub fn set_page_size(&mut self, page_size: u32) -> ClientResult<()> {
        if !self.pages.is_empty() || self.in_flight.is_some() {
            return Err(ClientError::PageSizeLocked);
        }
        self.base = PageRequest::new(page_size as i64, None)?;
        Ok(())
    }

    /// Drop all pages and start a new generation under the same filter.
    pub fn restart(&mut self) {
        self.pages.clear();
        self.generation += 1;
        self.in_flight = None;
        self.last_error = None;
        debug!(generation = self.generation, "List restarted");
    }

    /// Put back pages loaded before a failed reload.
    ///
    /// The pages come back under a new generation so anything the reload
    /// still has in flight is dropped.
    pub fn restore(&mut self, pages: Vec<Page<Entity>>, error: &ClientError) {
        self.pages = pages;
        self.generation += 1;
        self.in_flight = None;
        self.last_error = Some(error.to_string());
        debug!(generation = self.generation, pages = self.pages.len(), "Pages restored");
    }

    /// Claim the fetch slot for the next page.
    ///
    /// Returns `None` while another fetch runs or once the list is exhausted.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() || !self.has_more() {
            return None;
        }

        let cursor = self.pages.last().and_then(|page| page.next_cursor);
        self.in_flight = Some(self.generation);
        Some(FetchTicket {
            generation: self.generation,
            filter: self.filter.clone(),
            request: self.base.resume(cursor),
        })
    }

    /// Apply the result of a fetch claimed with `ticket`.
    ///
    /// Errors release the slot and keep the pages already loaded.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: ClientResult<Page<Entity>>,
    ) -> ClientResult<FetchOutcome> {
        if ticket.generation != self.generation {
            debug!(ticket = ticket.generation, current = self.generation, "Stale page dropped");
            return Ok(FetchOutcome::Stale);
        }
        self.in_flight = None;

        let page = match result.and_then(|page| self.check_page(page)) {
            Ok(page) => page,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        let outcome = FetchOutcome::Appended {
            items: page.len(),
            has_more: page.has_more(),
        };
        self.pages.push(page);
        self.last_error = None;
        Ok(outcome)
    }

    /// A page with a next cursor must be full; no page may exceed the size.
    fn check_page(&self, page: Page<Entity>) -> ClientResult<Page<Entity>> {
        let expected = self.page_size() as usize;
        let irregular = if page.has_more() {
            page.len() != expected
        } else {
            page.len() > expected
        };
        if irregular {
            return Err(ClientError::IrregularPage {
                expected,
                got: page.len(),
            });
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: i64) -> Entity {
        Entity {
            id,
            name: format!("cat-{id}"),
            title: format!("دسته {id}"),
        }
    }

    fn page(ids: std::ops::RangeInclusive<i64>, next: Option<i64>) -> Page<Entity> {
        Page {
            items: ids.map(entity).collect(),
            next_cursor: next.map(Cursor),
        }
    }

    fn loaded(page_size: u32, pages: Vec<Page<Entity>>) -> ListState {
        let mut state = ListState::new(page_size).unwrap();
        for p in pages {
            let ticket = state.begin_fetch().unwrap();
            state.finish_fetch(ticket, Ok(p)).unwrap();
        }
        state
    }

    #[test]
    fn test_first_ticket_has_no_cursor() {
        let mut state = ListState::new(10).unwrap();
        let ticket = state.begin_fetch().unwrap();
        assert_eq!(ticket.cursor(), None);
        assert_eq!(ticket.limit(), 10);
        assert!(state.is_fetching());
    }

    // Test critique: un seul fetch en vol par génération
    #[test]
    fn test_second_claim_while_fetching_is_refused() {
        let mut state = ListState::new(10).unwrap();
        let _ticket = state.begin_fetch().unwrap();
        assert!(state.begin_fetch().is_none());
    }

    #[test]
    fn test_next_ticket_continues_after_last_cursor() {
        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        let ticket = state.begin_fetch().unwrap();
        assert_eq!(ticket.cursor(), Some(Cursor(10)));
    }

    #[test]
    fn test_exhausted_list_issues_nothing() {
        let mut state = loaded(10, vec![page(1..=10, Some(10)), page(11..=12, None)]);
        assert!(!state.has_more());
        assert!(state.begin_fetch().is_none());
        assert_eq!(state.total_count(), 12);
    }

    // Test critique: changement de filtre pendant un fetch = réponse ignorée
    #[test]
    fn test_filter_change_drops_in_flight_response() {
        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        let old = state.begin_fetch().unwrap();

        assert!(state.set_filter(EntityFilter::search("web")));
        assert_eq!(state.total_count(), 0);
        assert!(!state.is_fetching());

        let fresh = state.begin_fetch().unwrap();
        assert_eq!(fresh.cursor(), None);
        assert_eq!(fresh.filter(), &EntityFilter::search("web"));

        let outcome = state.finish_fetch(old, Ok(page(11..=20, Some(20)))).unwrap();
        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(state.total_count(), 0);
        assert!(state.is_fetching());

        state.finish_fetch(fresh, Ok(page(3..=3, None))).unwrap();
        assert_eq!(state.items().map(|e| e.id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_same_filter_is_not_a_change() {
        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        assert!(!state.set_filter(EntityFilter::default()));
        assert_eq!(state.total_count(), 10);
    }

    #[test]
    fn test_item_at_arithmetic() {
        let state = loaded(4, vec![page(1..=4, Some(4)), page(5..=8, Some(8)), page(9..=10, None)]);
        for i in 0..10 {
            assert_eq!(state.item_at(i).map(|e| e.id), Some(i as i64 + 1));
        }
        assert!(state.item_at(10).is_none());
        assert!(state.item_at(100).is_none());
    }

    #[test]
    fn test_error_keeps_pages_and_releases_slot() {
        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        let ticket = state.begin_fetch().unwrap();

        let err = state
            .finish_fetch(ticket, Err(ClientError::Transport("connection reset".into())))
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!state.is_fetching());
        assert_eq!(state.total_count(), 10);
        assert!(state.last_error().is_some());

        // Retry resumes from the same cursor
        let retry = state.begin_fetch().unwrap();
        assert_eq!(retry.cursor(), Some(Cursor(10)));
        state.finish_fetch(retry, Ok(page(11..=11, None))).unwrap();
        assert!(state.last_error().is_none());
    }

    #[test]
    fn test_page_size_locked_once_loaded() {
        let mut state = ListState::new(10).unwrap();
        state.set_page_size(20).unwrap();
        assert_eq!(state.page_size(), 20);

        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        assert!(matches!(state.set_page_size(20), Err(ClientError::PageSizeLocked)));

        assert!(ListState::new(0).is_err());
        assert!(ListState::new(101).is_err());
    }

    #[test]
    fn test_short_non_final_page_is_rejected() {
        let mut state = ListState::new(10).unwrap();
        let ticket = state.begin_fetch().unwrap();
        let err = state.finish_fetch(ticket, Ok(page(1..=7, Some(7)))).unwrap_err();
        assert!(matches!(err, ClientError::IrregularPage { expected: 10, got: 7 }));
        assert_eq!(state.total_count(), 0);
    }

    #[test]
    fn test_restore_orphans_reload_in_flight() {
        let mut state = loaded(10, vec![page(1..=10, Some(10))]);
        let previous = state.pages().to_vec();
        state.restart();
        let reload = state.begin_fetch().unwrap();

        state.restore(previous, &ClientError::Transport("connection reset".into()));
        assert_eq!(state.total_count(), 10);
        assert!(!state.is_fetching());
        assert!(state.last_error().is_some());

        let late = state.finish_fetch(reload, Ok(page(1..=10, Some(10)))).unwrap();
        assert_eq!(late, FetchOutcome::Stale);
        assert_eq!(state.begin_fetch().unwrap().cursor(), Some(Cursor(10)));
    }

    #[test]
    fn test_restart_keeps_filter() {
        let mut state = ListState::new(10).unwrap();
        state.set_filter(EntityFilter::search("web"));
        let before = state.generation();
        state.restart();
        assert_eq!(state.generation(), before + 1);
        assert_eq!(state.filter(), &EntityFilter::search("web"));
    }
}
