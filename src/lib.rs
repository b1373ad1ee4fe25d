//! Orchestration layer for an OpenLibrary-backed catalog explorer.
//!
//! The crate covers the stateful side of the application: paginated catalog
//! search, the optimistic-then-enriched detail view, synthesized ratings,
//! the timed review pipeline for self-published submissions, and the
//! commission ledger. Presentation is an external collaborator that calls
//! the operations on [`session::Session`] and renders the snapshots they
//! return; no state survives the process.

pub mod catalog;
pub mod details;
pub mod error;
pub mod ledger;
pub mod models;
pub mod ratings;
pub mod review;
pub mod saved;
pub mod search;
pub mod session;
pub mod state;

pub use catalog::{CatalogClient, CatalogTransport, PAGE_SIZE};
pub use details::{DetailPhase, DetailResolver, DetailView};
pub use error::CatalogError;
pub use ledger::{commission_split, LedgerState, Party, OWNER_COMMISSION_RATE};
pub use models::{
    Author, AuthorDetails, Book, BookDetails, BookStatus, CatalogItem, CoverSize, DetailRecord,
    SearchPage, SearchType, TextValue, Transaction,
};
pub use review::{BookDraft, ReviewPipeline, PAYMENT_OPTIONS, REVIEW_DELAY};
pub use saved::SavedItemStore;
pub use search::{SearchOrchestrator, SearchView};
pub use session::Session;
pub use state::{SessionState, SharedState};
