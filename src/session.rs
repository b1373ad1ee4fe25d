//! The session aggregate: one `Session` owns the shared state and wires the
//! search orchestrator, detail resolver, review pipeline, and ledger into
//! the operations the presentation layer calls. All state lives for the
//! process only.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CatalogClient;
use crate::details::DetailResolver;
use crate::error::CatalogError;
use crate::ledger::Party;
use crate::models::{Book, Transaction};
use crate::review::{BookDraft, ReviewPipeline, REVIEW_DELAY};
use crate::search::SearchOrchestrator;
use crate::state::{self, SharedState};

/// Subjects shown on the landing view when no search is active.
pub const FEATURED_SUBJECTS: [&str; 5] = [
    "science_fiction",
    "fantasy",
    "mystery",
    "classic_literature",
    "romance",
];
pub const FEATURED_LIMIT: u32 = 10;

pub struct Session {
    client: Arc<CatalogClient>,
    state: SharedState,
    pub search: SearchOrchestrator,
    pub details: DetailResolver,
    review: ReviewPipeline,
}

impl Session {
    /// Session against the real catalog with the standard review delay.
    pub fn new() -> Result<Self, CatalogError> {
        Ok(Self::with_client(CatalogClient::new()?, REVIEW_DELAY))
    }

    /// Session with an injected client and review delay; tests run against a
    /// canned transport and millisecond reviews.
    pub fn with_client(client: CatalogClient, review_delay: Duration) -> Self {
        let client = Arc::new(client);
        let state = state::new_shared();
        Session {
            search: SearchOrchestrator::new(client.clone(), state.clone()),
            details: DetailResolver::new(client.clone()),
            review: ReviewPipeline::new(review_delay),
            client,
            state,
        }
    }

    // Submission

    pub fn submit_book(&self, draft: BookDraft) -> Result<Book, String> {
        self.review.submit(&self.state, draft)
    }

    /// Block until the review timer for `key` fires; see
    /// [`ReviewPipeline::wait`].
    pub fn wait_for_review(&self, key: &str) {
        self.review.wait(key)
    }

    // Saved set

    pub fn toggle_save(&self, book: &Book) -> bool {
        state::update_saved(&self.state, |saved| saved.toggle(book))
    }

    pub fn is_saved(&self, key: &str) -> bool {
        state::read(&self.state, |session| session.saved.is_saved(key))
    }

    pub fn saved_books(&self) -> Vec<Book> {
        state::read(&self.state, |session| session.saved.saved_books())
    }

    // Ledger

    pub fn purchase(&self, book: &Book) -> Option<Transaction> {
        state::update_ledger(&self.state, |ledger| ledger.purchase(book))
    }

    pub fn is_purchased(&self, key: &str) -> bool {
        state::read(&self.state, |session| session.ledger.is_purchased(key))
    }

    pub fn withdraw(&self, party: Party) -> String {
        state::read(&self.state, |session| session.ledger.withdraw(party))
    }

    /// `(author_balance, owner_balance)`.
    pub fn balances(&self) -> (f64, f64) {
        state::read(&self.state, |session| {
            (session.ledger.author_balance, session.ledger.owner_balance)
        })
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        state::read(&self.state, |session| session.ledger.transactions().to_vec())
    }

    // Submission snapshots

    pub fn published_books(&self) -> Vec<Book> {
        state::read(&self.state, |session| session.published_books())
    }

    pub fn pending_books(&self) -> Vec<Book> {
        state::read(&self.state, |session| session.pending_books())
    }

    pub fn purchased_books(&self) -> Vec<Book> {
        state::read(&self.state, |session| session.purchased_books())
    }

    pub fn user_books(&self) -> Vec<Book> {
        state::read(&self.state, |session| session.user_books.clone())
    }

    // Featured subjects

    /// Landing-view shelves for the default subjects.
    pub fn featured(&self) -> Vec<(String, Vec<Book>)> {
        self.featured_subjects(&FEATURED_SUBJECTS, FEATURED_LIMIT)
    }

    /// Fetch each subject's works; subjects that fail or come back empty are
    /// skipped so one bad shelf never hides the rest.
    pub fn featured_subjects(&self, subjects: &[&str], limit: u32) -> Vec<(String, Vec<Book>)> {
        subjects
            .iter()
            .filter_map(|subject| match self.client.books_by_subject(subject, limit) {
                Ok(books) if books.is_empty() => None,
                Ok(books) => Some((subject.to_string(), books)),
                Err(err) => {
                    log::warn!("featured subject {} failed: {}", subject, err);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::testing::FakeTransport;
    use crate::models::{BookStatus, SearchType};

    fn session_with(transport: &Arc<FakeTransport>) -> Session {
        let client = CatalogClient::with_transport(transport.clone())
            .with_base_url("https://catalog.test");
        Session::with_client(client, Duration::from_millis(20))
    }

    fn draft(title: &str, price: f64) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Indie Author".to_string(),
            description: Some("Self-published.".to_string()),
            price,
            cover_image_url: None,
            payment_methods: vec!["PayPal".to_string()],
        }
    }

    #[test]
    fn submission_flows_from_pending_to_searchable_and_purchasable() {
        let transport = FakeTransport::new();
        transport.respond(
            "/search.json",
            json!({
                "docs": [{"key": "/works/OL1W", "title": "Remote Hit"}],
                "numFound": 1
            }),
        );
        let session = session_with(&transport);

        let book = session.submit_book(draft("My Novel", 10.0)).expect("submit");
        assert_eq!(book.status, Some(BookStatus::Pending));

        // Pending submissions stay out of search results.
        let page = session
            .search
            .search("novel", SearchType::Books, 1)
            .expect("search");
        assert_eq!(page.items.len(), 1);

        session.wait_for_review(&book.key);
        assert_eq!(session.published_books().len(), 1);

        // Published submissions lead the results.
        let page = session
            .search
            .search("novel", SearchType::Books, 1)
            .expect("search");
        assert_eq!(page.items[0].key(), book.key);
        assert_eq!(page.total_found, 1, "local book not counted");

        let transaction = session.purchase(&book).expect("purchase");
        assert_eq!(transaction.author_cut + transaction.owner_cut, 10.0);
        assert_eq!(transaction.owner_cut, 10.0 * 0.05);
        assert!(session.is_purchased(&book.key));
        assert_eq!(session.purchased_books().len(), 1);

        let (author_balance, owner_balance) = session.balances();
        assert_eq!(author_balance, transaction.author_cut);
        assert_eq!(owner_balance, transaction.owner_cut);
        assert_eq!(session.transactions().len(), 1);
    }

    #[test]
    fn toggle_save_round_trips_through_the_session() {
        let session = session_with(&FakeTransport::new());
        let book = Book {
            key: "/works/OL1W".to_string(),
            title: "Dune".to_string(),
            ..Book::default()
        };

        assert!(session.toggle_save(&book));
        assert!(session.is_saved(&book.key));
        assert_eq!(session.saved_books().len(), 1);

        assert!(!session.toggle_save(&book));
        assert!(!session.is_saved(&book.key));
        assert!(session.saved_books().is_empty());
    }

    #[test]
    fn withdraw_reports_without_clearing_balances() {
        let session = session_with(&FakeTransport::new());
        let book = session.submit_book(draft("Paid Book", 20.0)).expect("submit");
        session.purchase(&book).expect("purchase");

        let before = session.balances();
        let message = session.withdraw(Party::Author);
        assert!(message.starts_with("Withdrawal of $19.00 for Author"));
        assert_eq!(session.balances(), before);
        // Submission cleanup so the timer thread does not outlive the test.
        session.wait_for_review(&book.key);
    }

    #[test]
    fn featured_skips_failing_and_empty_subjects() {
        let transport = FakeTransport::new();
        transport.respond(
            "/subjects/fantasy.json",
            json!({
                "works": [
                    {"key": "/works/OL3W", "title": "The Hobbit",
                     "authors": [{"name": "J. R. R. Tolkien"}]}
                ]
            }),
        );
        transport.respond("/subjects/romance.json", json!({ "works": [] }));
        transport.fail("/subjects/mystery.json", 500, "boom");
        let session = session_with(&transport);

        let shelves = session.featured_subjects(&["fantasy", "romance", "mystery"], 10);

        assert_eq!(shelves.len(), 1);
        assert_eq!(shelves[0].0, "fantasy");
        assert_eq!(shelves[0].1.len(), 1);
        assert!(shelves[0].1[0].average_rating.is_some());
    }
}
