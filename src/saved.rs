use std::collections::HashMap;

use crate::models::{Book, CatalogItem};

/// User-curated set of saved books, keyed by catalog key. Process-lifetime
/// only; toggling the same book twice restores the prior membership state.
#[derive(Debug, Clone, Default)]
pub struct SavedItemStore {
    books: HashMap<String, Book>,
}

impl SavedItemStore {
    /// Insert the book if absent, remove it if present. Returns whether the
    /// book is saved afterwards.
    pub fn toggle(&mut self, book: &Book) -> bool {
        if self.books.remove(&book.key).is_some() {
            false
        } else {
            let mut saved = book.clone();
            saved.is_saved = true;
            self.books.insert(book.key.clone(), saved);
            true
        }
    }

    pub fn is_saved(&self, key: &str) -> bool {
        self.books.contains_key(key)
    }

    pub fn saved_books(&self) -> Vec<Book> {
        self.books.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Stamp the saved flag onto outgoing book results; author results pass
    /// through untouched.
    pub fn annotate(&self, items: Vec<CatalogItem>) -> Vec<CatalogItem> {
        items
            .into_iter()
            .map(|item| match item {
                CatalogItem::Book(mut book) => {
                    book.is_saved = self.is_saved(&book.key);
                    CatalogItem::Book(book)
                }
                other => other,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;

    fn book(key: &str) -> Book {
        Book {
            key: key.to_string(),
            title: format!("Book {}", key),
            ..Book::default()
        }
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut store = SavedItemStore::default();
        let one = book("/works/OL1W");

        assert!(store.toggle(&one));
        assert!(store.is_saved("/works/OL1W"));

        assert!(!store.toggle(&one));
        assert!(!store.is_saved("/works/OL1W"));
        assert!(store.is_empty());
    }

    #[test]
    fn annotate_flags_saved_books_only() {
        let mut store = SavedItemStore::default();
        store.toggle(&book("/works/OL1W"));

        let items = vec![
            CatalogItem::Book(book("/works/OL1W")),
            CatalogItem::Book(book("/works/OL2W")),
            CatalogItem::Author(Author {
                key: "OL3A".to_string(),
                name: "Someone".to_string(),
                ..Author::default()
            }),
        ];
        let annotated = store.annotate(items);

        assert!(annotated[0].as_book().map(|b| b.is_saved).unwrap_or(false));
        assert!(!annotated[1].as_book().map(|b| b.is_saved).unwrap_or(true));
        assert!(annotated[2].as_book().is_none());
    }

    #[test]
    fn saved_books_snapshot_carries_saved_flag() {
        let mut store = SavedItemStore::default();
        store.toggle(&book("/works/OL1W"));
        let snapshot = store.saved_books();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].is_saved);
    }
}
