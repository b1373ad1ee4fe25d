//! Deterministic pseudo-rating synthesis.
//!
//! The catalog does not serve ratings, so each item gets one derived from its
//! key: the classic 32-bit string hash (`h = h*31 + code_unit` with
//! two's-complement wrap) mapped into a fixed rating and count range. The
//! same key always yields the same pair, across calls and across runs.

use crate::models::Book;

/// Synthesized rating, 2-decimal average in [1.50, 4.90].
pub fn rating_for(key: &str) -> f64 {
    let magnitude = key_hash(key).unsigned_abs();
    let tenths = (magnitude % 35) + 15;
    let rating = tenths as f64 / 10.0;
    (rating * 100.0).round() / 100.0
}

/// Synthesized rating count in [50, 1549].
pub fn rating_count_for(key: &str) -> u32 {
    key_hash(key).unsigned_abs() % 1500 + 50
}

/// Stamp a book with its synthesized rating fields. Books without a key are
/// left untouched.
pub fn enrich(book: &mut Book) {
    if book.key.is_empty() {
        return;
    }
    book.average_rating = Some(rating_for(&book.key));
    book.ratings_count = Some(rating_count_for(&book.key));
}

pub fn enrich_all(books: &mut [Book]) {
    for book in books {
        enrich(book);
    }
}

// UTF-16 code units, matching the charCode-by-charCode fold the rating
// scheme is defined over.
fn key_hash(key: &str) -> i32 {
    let mut hash: i32 = 0;
    for unit in key.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(unit as i32);
    }
    hash
}
