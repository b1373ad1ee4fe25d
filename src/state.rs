use std::sync::{Arc, Mutex, MutexGuard};

use crate::ledger::LedgerState;
use crate::models::{Book, BookStatus};
use crate::saved::SavedItemStore;

/// The session's mutable state, held as one explicit aggregate rather than
/// ambient singletons. Everything here lives for the process only.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// User submissions, newest first.
    pub user_books: Vec<Book>,
    pub saved: SavedItemStore,
    pub ledger: LedgerState,
}

impl SessionState {
    pub fn published_books(&self) -> Vec<Book> {
        self.user_books
            .iter()
            .filter(|book| book.status == Some(BookStatus::Published))
            .cloned()
            .collect()
    }

    pub fn pending_books(&self) -> Vec<Book> {
        self.user_books
            .iter()
            .filter(|book| book.status == Some(BookStatus::Pending))
            .cloned()
            .collect()
    }

    pub fn purchased_books(&self) -> Vec<Book> {
        self.user_books
            .iter()
            .filter(|book| self.ledger.is_purchased(&book.key))
            .cloned()
            .collect()
    }

    pub fn find_submission(&self, key: &str) -> Option<&Book> {
        self.user_books.iter().find(|book| book.key == key)
    }
}

/// Shared handle to the aggregate. Background completions (review timers,
/// detached fetches) carry a clone and apply their effects through it.
pub type SharedState = Arc<Mutex<SessionState>>;

pub fn new_shared() -> SharedState {
    Arc::new(Mutex::new(SessionState::default()))
}

// A poisoned lock only means another thread panicked mid-update of a clone;
// the aggregate itself is always whole, so recover the guard.
pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, SessionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(crate) fn read<R>(state: &SharedState, f: impl FnOnce(&SessionState) -> R) -> R {
    f(&lock(state))
}

// The update helpers mutate a copy of one substructure and swap it in whole,
// so a reader never observes a half-applied change.

pub(crate) fn update_books<R>(state: &SharedState, f: impl FnOnce(&mut Vec<Book>) -> R) -> R {
    let mut guard = lock(state);
    let mut books = guard.user_books.clone();
    let result = f(&mut books);
    guard.user_books = books;
    result
}

pub(crate) fn update_saved<R>(state: &SharedState, f: impl FnOnce(&mut SavedItemStore) -> R) -> R {
    let mut guard = lock(state);
    let mut saved = guard.saved.clone();
    let result = f(&mut saved);
    guard.saved = saved;
    result
}

pub(crate) fn update_ledger<R>(state: &SharedState, f: impl FnOnce(&mut LedgerState) -> R) -> R {
    let mut guard = lock(state);
    let mut ledger = guard.ledger.clone();
    let result = f(&mut ledger);
    guard.ledger = ledger;
    result
}
