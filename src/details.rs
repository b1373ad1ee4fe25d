use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::catalog::CatalogClient;
use crate::error::CatalogError;
use crate::models::{CatalogItem, DetailRecord};

pub const DETAILS_FAILED_MESSAGE: &str = "Failed to fetch details. Please try again.";

/// Where the current selection stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPhase {
    /// Nothing selected.
    #[default]
    Idle,
    /// Summary data shown, enrichment still in flight.
    Partial,
    /// Enrichment merged in.
    Full,
    /// Enrichment failed; the partial record is retained.
    Failed,
}

/// Snapshot of the selection slot.
#[derive(Debug, Clone, Default)]
pub struct DetailView {
    pub seq: u64,
    pub phase: DetailPhase,
    pub record: Option<DetailRecord>,
    pub error: Option<String>,
}

/// Two-phase detail resolution over a single selection slot: the summary
/// record is shown immediately, then the enrichment fetch merges richer
/// fields in when it completes. Selections are sequence-guarded the same way
/// searches are, so a completion for an abandoned selection is discarded
/// rather than merged into the wrong record.
pub struct DetailResolver {
    client: Arc<CatalogClient>,
    seq: AtomicU64,
    view: Arc<Mutex<DetailView>>,
}

impl DetailResolver {
    pub fn new(client: Arc<CatalogClient>) -> Self {
        DetailResolver {
            client,
            seq: AtomicU64::new(0),
            view: Arc::new(Mutex::new(DetailView::default())),
        }
    }

    /// Select an item: the slot shows its summary immediately and the
    /// enrichment runs on a background thread. A locally-submitted book has
    /// no remote identity, so it resolves as already-full with no fetch.
    pub fn select(&self, item: CatalogItem) {
        let (seq, enrich) = self.begin(&item);
        if !enrich {
            return;
        }
        let client = self.client.clone();
        let view = self.view.clone();
        thread::spawn(move || {
            let result = fetch_details(&client, &item);
            finish(&view, seq, result);
        });
    }

    /// Synchronous resolution for callers that serialize their own requests:
    /// summary plus enrichment merged before returning. Failures yield the
    /// generic message; the caller still holds the summary it passed in.
    pub fn resolve(&self, item: CatalogItem) -> Result<DetailRecord, String> {
        let user_book = item.as_book().map(|book| book.is_user_book).unwrap_or(false);
        let mut record = DetailRecord::from_summary(item.clone());
        if user_book {
            return Ok(record);
        }
        match fetch_details(&self.client, &item) {
            Ok(incoming) => {
                record.merge(incoming);
                Ok(record)
            }
            Err(err) => {
                log::warn!("detail fetch failed: key={} err={}", item.key(), err);
                Err(DETAILS_FAILED_MESSAGE.to_string())
            }
        }
    }

    /// Drop the current selection. Bumps the sequence so any in-flight
    /// enrichment for it is discarded on arrival.
    pub fn clear(&self) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut view = lock_view(&self.view);
        *view = DetailView {
            seq,
            ..DetailView::default()
        };
    }

    pub fn view(&self) -> DetailView {
        lock_view(&self.view).clone()
    }

    // Install the summary record and report whether enrichment is needed.
    fn begin(&self, item: &CatalogItem) -> (u64, bool) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let user_book = item.as_book().map(|book| book.is_user_book).unwrap_or(false);
        let mut view = lock_view(&self.view);
        *view = DetailView {
            seq,
            phase: if user_book {
                DetailPhase::Full
            } else {
                DetailPhase::Partial
            },
            record: Some(DetailRecord::from_summary(item.clone())),
            error: None,
        };
        (seq, !user_book)
    }
}

fn lock_view(view: &Arc<Mutex<DetailView>>) -> MutexGuard<'_, DetailView> {
    match view.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn finish(view: &Arc<Mutex<DetailView>>, seq: u64, result: Result<DetailRecord, CatalogError>) {
    let mut view = lock_view(view);
    if view.seq != seq {
        log::debug!(
            "discarding stale detail completion seq={} (latest {})",
            seq,
            view.seq
        );
        return;
    }
    match result {
        Ok(incoming) => {
            match &mut view.record {
                Some(record) => record.merge(incoming),
                None => view.record = Some(incoming),
            }
            view.phase = DetailPhase::Full;
            view.error = None;
        }
        Err(err) => {
            log::warn!("detail fetch failed: {}", err);
            view.phase = DetailPhase::Failed;
            view.error = Some(DETAILS_FAILED_MESSAGE.to_string());
        }
    }
}

fn fetch_details(client: &CatalogClient, item: &CatalogItem) -> Result<DetailRecord, CatalogError> {
    match item {
        CatalogItem::Book(book) => client.book_details(&book.key).map(DetailRecord::Book),
        CatalogItem::Author(author) => {
            client.author_details(&author.key).map(DetailRecord::Author)
        }
    }
}
