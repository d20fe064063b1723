//! Paginated listing over the entry store.
//!
//! The controller owns a [`ListingPage`] behind a mutex that is never held
//! across an await, so callers may fire loads concurrently (scroll events,
//! mutation reloads). In-flight guards keep a page from being fetched twice
//! and a generation counter drops results that a newer rebuild superseded.

mod page;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub use page::{ListingPage, Notice, NoticeKind, SUCCESS_NOTICE_DURATION};

use crate::{
    clock::{Clock, SystemClock},
    domain::{EntryId, ListingError, StoreError},
    gate::VerifiedSession,
    ports::{EntryStore, PageRange},
};

pub const PAGE_SIZE: usize = 10;
pub const BLUR_LENGTH: usize = 100;
/// Distance from the bottom at which scrolling pulls the next page.
pub const SCROLL_THRESHOLD: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub page_size: usize,
    pub preview_len: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            preview_len: BLUR_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { added: usize, total: usize },
    /// Nothing to do: the end was reached or a page load is already running.
    Skipped,
    /// The result arrived after the list was rebuilt or closed and was dropped.
    Discarded,
}

/// Where the viewport sits within the scrollable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPosition {
    pub offset: u32,
    pub viewport_height: u32,
    pub content_height: u32,
}

impl ScrollPosition {
    pub fn near_bottom(&self, threshold: u32) -> bool {
        self.offset.saturating_add(self.viewport_height)
            >= self.content_height.saturating_sub(threshold)
    }
}

pub struct ListingController<S: ?Sized> {
    pub(crate) store: Arc<S>,
    pub(crate) config: ListingConfig,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) page: Mutex<ListingPage>,
    session: VerifiedSession,
}

impl<S: EntryStore + ?Sized> ListingController<S> {
    /// A `page_size` of zero is raised to one.
    pub fn new(session: VerifiedSession, store: Arc<S>, config: ListingConfig) -> Self {
        if config.page_size == 0 {
            warn!("page_size of 0 raised to 1");
        }
        Self {
            store,
            config: ListingConfig {
                page_size: config.page_size.max(1),
                ..config
            },
            clock: Arc::new(SystemClock),
            page: Mutex::new(ListingPage::default()),
            session,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn session(&self) -> &VerifiedSession {
        &self.session
    }

    pub fn config(&self) -> ListingConfig {
        self.config
    }

    /// Copy of the current page state for rendering.
    pub fn snapshot(&self) -> ListingPage {
        self.lock().clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        let now = self.clock.now();
        self.lock().notice(now).cloned()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ListingPage> {
        self.page.lock().expect("listing page lock poisoned")
    }

    /// Rebuilds the list from the newest entry.
    #[instrument(name = "load_first_page", skip(self))]
    pub async fn load_first_page(&self) -> Result<LoadOutcome, ListingError> {
        let limit = self.config.page_size;
        let generation = self.lock().begin_rebuild();

        let result = self.store.list(Some(PageRange::new(0, limit))).await;

        let mut page = self.lock();
        if !page.is_current(generation) {
            debug!(generation, "discarding superseded first page");
            return Ok(LoadOutcome::Discarded);
        }
        page.page_in_flight = false;

        let rows = self.check(&mut page, result)?;
        let added = rows.len();
        page.replace(rows, self.config.preview_len, added < limit);
        debug!(added, end_reached = page.end_reached, "first page loaded");

        Ok(LoadOutcome::Loaded {
            added,
            total: page.entries.len(),
        })
    }

    /// Appends the next page unless the end was reached or a load is running.
    #[instrument(name = "load_next_page", skip(self))]
    pub async fn load_next_page(&self) -> Result<LoadOutcome, ListingError> {
        let limit = self.config.page_size;
        let (generation, offset) = {
            let mut page = self.lock();
            if page.closed || page.end_reached || page.page_in_flight {
                return Ok(LoadOutcome::Skipped);
            }
            page.page_in_flight = true;
            (page.generation, page.entries.len())
        };

        let result = self.store.list(Some(PageRange::new(offset, limit))).await;

        let mut page = self.lock();
        if !page.is_current(generation) {
            debug!(offset, "discarding page from a superseded listing");
            return Ok(LoadOutcome::Discarded);
        }
        page.page_in_flight = false;

        let rows = self.check(&mut page, result)?;
        let fetched = rows.len();
        let added = page.append(rows, self.config.preview_len);
        page.end_reached = fetched < limit;
        debug!(offset, fetched, added, end_reached = page.end_reached, "page appended");

        Ok(LoadOutcome::Loaded {
            added,
            total: page.entries.len(),
        })
    }

    /// Loads every entry at once. Paging stays off until the next first-page load.
    #[instrument(name = "load_all", skip(self))]
    pub async fn load_all(&self) -> Result<LoadOutcome, ListingError> {
        let generation = self.lock().begin_rebuild();

        let result = self.store.list(None).await;

        let mut page = self.lock();
        if !page.is_current(generation) {
            return Ok(LoadOutcome::Discarded);
        }
        page.page_in_flight = false;

        let rows = self.check(&mut page, result)?;
        let added = rows.len();
        page.replace(rows, self.config.preview_len, true);

        Ok(LoadOutcome::Loaded {
            added,
            total: page.entries.len(),
        })
    }

    /// Pulls the next page when the viewport is close to the bottom.
    pub async fn on_scroll(&self, position: ScrollPosition) -> Result<LoadOutcome, ListingError> {
        if position.near_bottom(SCROLL_THRESHOLD) {
            self.load_next_page().await
        } else {
            Ok(LoadOutcome::Skipped)
        }
    }

    /// Shows the full body of `id`, fetching it once per session.
    ///
    /// Returns `None` when another call is already fetching the same body.
    #[instrument(name = "expand", skip(self, id), fields(id = %id))]
    pub async fn expand(&self, id: &EntryId) -> Result<Option<String>, ListingError> {
        {
            let mut page = self.lock();
            page.expanded_id = Some(id.clone());
            if let Some(body) = page.body_cache.get(id) {
                return Ok(Some(body.clone()));
            }
            if !page.bodies_in_flight.insert(id.clone()) {
                debug!("body fetch already in flight");
                return Ok(None);
            }
        }

        let result = self.store.fetch_body(id).await;

        let mut page = self.lock();
        // Deleting the entry or closing the view cancels the fetch.
        if !page.bodies_in_flight.remove(id) || page.closed {
            return Ok(None);
        }

        let body = self.check(&mut page, result)?;
        page.body_cache.insert(id.clone(), body.clone());
        Ok(Some(body))
    }

    pub fn collapse(&self) {
        self.lock().expanded_id = None;
    }

    /// Detaches the view; results still in flight are dropped on arrival.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Records a store failure as the visible notice and turns it into an error.
    pub(crate) fn check<T>(
        &self,
        page: &mut ListingPage,
        result: Result<T, StoreError>,
    ) -> Result<T, ListingError> {
        result.map_err(|err| {
            warn!(error = %err, "store call failed");
            page.notice = Some(Notice::error(err.to_string()));
            ListingError::Store(err)
        })
    }
}
