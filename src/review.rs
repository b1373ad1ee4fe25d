//! Simulated review pipeline for user-submitted books.
//!
//! A submission enters the shared state as `Pending` and a fire-and-forget
//! timer flips it to `Published` after the review delay. The timer runs on
//! its own thread, so the transition happens whether or not any view is
//! observing the submission, and it cannot be cancelled.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use uuid::Uuid;

use crate::models::{Book, BookStatus, TextValue};
use crate::state::{self, SharedState};

/// How long the simulated review takes.
pub const REVIEW_DELAY: Duration = Duration::from_secs(5);

/// Payout methods offered to submitters.
pub const PAYMENT_OPTIONS: [&str; 5] = [
    "PayPal",
    "Credit Card",
    "Google Pay",
    "Apple Pay",
    "BaridiMob",
];

/// Fields collected from the submission form.
#[derive(Debug, Clone, Default)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub price: f64,
    pub cover_image_url: Option<String>,
    pub payment_methods: Vec<String>,
}

pub struct ReviewPipeline {
    delay: Duration,
    timers: Mutex<HashMap<String, thread::JoinHandle<()>>>,
}

impl ReviewPipeline {
    pub fn new(delay: Duration) -> Self {
        ReviewPipeline {
            delay,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Validate a draft, add it to the shared state as `Pending`, and start
    /// its review timer. The accepted book is returned so the caller can
    /// render it immediately.
    pub fn submit(&self, state: &SharedState, draft: BookDraft) -> Result<Book, String> {
        let title = draft.title.trim();
        let author = draft.author.trim();
        if title.is_empty() || author.is_empty() || !(draft.price > 0.0) {
            return Err("Please fill out Title, Author, and Price.".to_string());
        }

        let book = Book {
            key: format!("user-{}", Uuid::new_v4()),
            title: title.to_string(),
            author_name: Some(vec![author.to_string()]),
            description: draft
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty())
                .map(TextValue::Text),
            price: Some(draft.price),
            payment_methods: Some(draft.payment_methods),
            is_user_book: true,
            cover_image_url: draft.cover_image_url,
            status: Some(BookStatus::Pending),
            ..Book::default()
        };

        state::update_books(state, |books| books.insert(0, book.clone()));
        log::info!("submission accepted: {} (\"{}\")", book.key, book.title);
        self.schedule(state.clone(), book.key.clone());
        Ok(book)
    }

    fn schedule(&self, state: SharedState, key: String) {
        let delay = self.delay;
        let timer_key = key.clone();
        let handle = thread::spawn(move || {
            thread::sleep(delay);
            publish(&state, &key);
        });
        let mut timers = match self.timers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        timers.insert(timer_key, handle);
    }

    /// Block until the review timer for `key` has fired. Useful in tests and
    /// at shutdown; a key with no timer returns immediately.
    pub fn wait(&self, key: &str) {
        let handle = {
            let mut timers = match self.timers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            timers.remove(key)
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

// Replace only the status field of the submission; a book that is no longer
// present makes the fired timer a no-op.
fn publish(state: &SharedState, key: &str) {
    let published = state::update_books(state, |books| {
        match books.iter_mut().find(|book| book.key == key) {
            Some(book) => {
                book.status = Some(BookStatus::Published);
                true
            }
            None => false,
        }
    });
    if published {
        log::info!("review complete, published {}", key);
    } else {
        log::debug!("review timer fired for missing submission {}", key);
    }
}
