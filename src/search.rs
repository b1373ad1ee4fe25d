use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::catalog::CatalogClient;
use crate::error::CatalogError;
use crate::models::{CatalogItem, SearchPage, SearchType};
use crate::state::{self, SharedState};

/// The single user-facing failure condition for searches; partial failures
/// are not distinguished from total ones.
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to fetch results. Please try again.";

/// Snapshot of the search slot the presentation layer renders from.
#[derive(Debug, Clone, Default)]
pub struct SearchView {
    pub seq: u64,
    pub loading: bool,
    pub page: Option<SearchPage>,
    pub total_pages: u32,
    pub error: Option<String>,
}

/// Drives paginated catalog search. Detached searches run on background
/// threads and deliver through a sequence-guarded slot: every request bumps
/// an atomic counter, and a completion is applied only while its sequence is
/// still the newest issued, so a slow page-2 response can never overwrite a
/// faster page-3 one.
pub struct SearchOrchestrator {
    client: Arc<CatalogClient>,
    state: SharedState,
    seq: AtomicU64,
    view: Arc<Mutex<SearchView>>,
}

impl SearchOrchestrator {
    pub fn new(client: Arc<CatalogClient>, state: SharedState) -> Self {
        SearchOrchestrator {
            client,
            state,
            seq: AtomicU64::new(0),
            view: Arc::new(Mutex::new(SearchView::default())),
        }
    }

    /// One-shot synchronous search. An empty or whitespace query returns an
    /// empty page without touching the network. Overlapping calls are the
    /// caller's concern here (last write wins at the collaborator layer);
    /// the guarded slot only serves [`Self::search_detached`].
    pub fn search(
        &self,
        query: &str,
        search_type: SearchType,
        page: u32,
    ) -> Result<SearchPage, String> {
        if query.trim().is_empty() {
            return Ok(SearchPage::empty());
        }
        match fetch(&self.client, query, search_type, page) {
            Ok(found) => Ok(decorate(&self.state, found, search_type)),
            Err(err) => {
                log::warn!("search failed: query={:?} page={} err={}", query, page, err);
                Err(SEARCH_FAILED_MESSAGE.to_string())
            }
        }
    }

    /// Issue the search on a background thread and deliver into the view
    /// slot. Does not cancel any in-flight search; an older completion is
    /// simply discarded when it arrives after a newer request.
    pub fn search_detached(&self, query: &str, search_type: SearchType, page: u32) {
        let seq = self.begin();
        if query.trim().is_empty() {
            finish(&self.view, self.client.page_size(), seq, Ok(SearchPage::empty()));
            return;
        }

        let client = self.client.clone();
        let state = self.state.clone();
        let view = self.view.clone();
        let query = query.to_string();
        thread::spawn(move || {
            let result = fetch(&client, &query, search_type, page)
                .map(|found| decorate(&state, found, search_type));
            finish(&view, client.page_size(), seq, result);
        });
    }

    pub fn view(&self) -> SearchView {
        lock_view(&self.view).clone()
    }

    fn begin(&self) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut view = lock_view(&self.view);
        view.seq = seq;
        view.loading = true;
        view.error = None;
        seq
    }
}

fn lock_view(view: &Arc<Mutex<SearchView>>) -> MutexGuard<'_, SearchView> {
    match view.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn finish(
    view: &Arc<Mutex<SearchView>>,
    page_size: u32,
    seq: u64,
    result: Result<SearchPage, CatalogError>,
) {
    let mut view = lock_view(view);
    if view.seq != seq {
        log::debug!(
            "discarding stale search completion seq={} (latest {})",
            seq,
            view.seq
        );
        return;
    }
    view.loading = false;
    match result {
        Ok(page) => {
            view.total_pages = page.total_pages(page_size);
            view.page = Some(page);
            view.error = None;
        }
        Err(err) => {
            log::warn!("search failed: {}", err);
            view.page = None;
            view.total_pages = 0;
            view.error = Some(SEARCH_FAILED_MESSAGE.to_string());
        }
    }
}

fn fetch(
    client: &CatalogClient,
    query: &str,
    search_type: SearchType,
    page: u32,
) -> Result<SearchPage, CatalogError> {
    match search_type {
        SearchType::Books => {
            let response = client.search_books(query, page)?;
            Ok(SearchPage {
                items: response.docs.into_iter().map(CatalogItem::Book).collect(),
                total_found: response.num_found,
            })
        }
        SearchType::Authors => {
            let response = client.search_authors(query, page)?;
            Ok(SearchPage {
                items: response.docs.into_iter().map(CatalogItem::Author).collect(),
                total_found: response.num_found,
            })
        }
    }
}

// Published local submissions go ahead of remote ordering for book searches
// and never count toward total_found, so pagination math stays remote-only.
// Saved flags are stamped on the combined list.
fn decorate(state: &SharedState, page: SearchPage, search_type: SearchType) -> SearchPage {
    if search_type != SearchType::Books {
        return page;
    }
    let SearchPage { items, total_found } = page;
    state::read(state, |session| {
        let mut combined: Vec<CatalogItem> = session
            .published_books()
            .into_iter()
            .map(CatalogItem::Book)
            .collect();
        combined.extend(items);
        SearchPage {
            items: session.saved.annotate(combined),
            total_found,
        }
    })
}
