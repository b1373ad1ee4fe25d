use std::collections::HashSet;

use chrono::Utc;

use crate::models::{Book, Transaction};

/// Platform share of every sale.
pub const OWNER_COMMISSION_RATE: f64 = 0.05;

/// Split a sale price into `(author_cut, owner_cut)`. The author's share is
/// the remainder after the owner's commission, never an independent
/// multiplication, so the two cuts always sum back to the price exactly.
pub fn commission_split(price: f64) -> (f64, f64) {
    let owner_cut = price * OWNER_COMMISSION_RATE;
    (price - owner_cut, owner_cut)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Author,
    Owner,
}

impl Party {
    fn display(&self) -> &'static str {
        match self {
            Party::Author => "Author",
            Party::Owner => "Owner",
        }
    }
}

/// Running balances, the purchased-key set, and the immutable transaction
/// log (most recent first). Each balance equals the sum of the matching cut
/// over every recorded transaction at all times.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    pub author_balance: f64,
    pub owner_balance: f64,
    transactions: Vec<Transaction>,
    purchased: HashSet<String>,
}

impl LedgerState {
    /// Execute a purchase. Books without a price are skipped, not failed;
    /// the guard is defensive, not a domain error.
    pub fn purchase(&mut self, book: &Book) -> Option<Transaction> {
        let price = book.price?;
        let (author_cut, owner_cut) = commission_split(price);

        // Clamp so the log stays non-decreasing even if the clock steps back.
        let mut timestamp = Utc::now();
        if let Some(newest) = self.transactions.first() {
            if timestamp < newest.timestamp {
                timestamp = newest.timestamp;
            }
        }

        let transaction = Transaction {
            book_key: book.key.clone(),
            book_title: book.title.clone(),
            price,
            author_cut,
            owner_cut,
            timestamp,
        };
        self.transactions.insert(0, transaction.clone());
        self.author_balance += author_cut;
        self.owner_balance += owner_cut;
        self.purchased.insert(book.key.clone());
        log::info!(
            "recorded purchase of \"{}\" for {:.2} (owner cut {:.2})",
            book.title,
            price,
            owner_cut
        );
        Some(transaction)
    }

    pub fn is_purchased(&self, key: &str) -> bool {
        self.purchased.contains(key)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn balance(&self, party: Party) -> f64 {
        match party {
            Party::Author => self.author_balance,
            Party::Owner => self.owner_balance,
        }
    }

    /// Withdrawal is a simulated acknowledgement only. Balances are
    /// cumulative totals, not available cash, so nothing is zeroed and the
    /// transaction log is untouched.
    pub fn withdraw(&self, party: Party) -> String {
        let amount = self.balance(party);
        if amount <= 0.0 {
            return "No funds to withdraw.".to_string();
        }
        format!(
            "Withdrawal of ${:.2} for {} initiated. Funds will be transferred \
             to your linked payment method shortly. (This is a simulation, no \
             real transaction will occur.)",
            amount,
            party.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced_book(key: &str, price: f64) -> Book {
        Book {
            key: key.to_string(),
            title: format!("Book {}", key),
            price: Some(price),
            ..Book::default()
        }
    }

    #[test]
    fn cuts_sum_back_to_price_exactly() {
        for price in [9.99, 0.01, 3.13, 19.95, 100.0, 0.1 + 0.2] {
            let (author_cut, owner_cut) = commission_split(price);
            assert_eq!(author_cut + owner_cut, price, "price {}", price);
            assert_eq!(owner_cut, price * 0.05);
        }
    }

    #[test]
    fn balances_track_the_sum_of_cuts_at_every_step() {
        let mut ledger = LedgerState::default();
        for (index, price) in [9.99, 4.5, 12.34, 0.99].iter().enumerate() {
            ledger
                .purchase(&priced_book(&format!("/works/OL{}W", index), *price))
                .expect("purchase");

            // Sum oldest-first, the order the balances accumulated in.
            let author_sum: f64 = ledger.transactions().iter().rev().map(|t| t.author_cut).sum();
            let owner_sum: f64 = ledger.transactions().iter().rev().map(|t| t.owner_cut).sum();
            assert_eq!(ledger.author_balance, author_sum);
            assert_eq!(ledger.owner_balance, owner_sum);
        }
    }

    #[test]
    fn log_is_most_recent_first_with_non_decreasing_timestamps() {
        let mut ledger = LedgerState::default();
        ledger.purchase(&priced_book("/works/OL1W", 5.0)).expect("first");
        ledger.purchase(&priced_book("/works/OL2W", 7.0)).expect("second");

        let log = ledger.transactions();
        assert_eq!(log[0].book_key, "/works/OL2W");
        assert_eq!(log[1].book_key, "/works/OL1W");
        assert!(log[0].timestamp >= log[1].timestamp);
    }

    #[test]
    fn priceless_purchase_is_skipped_without_side_effects() {
        let mut ledger = LedgerState::default();
        let mut book = priced_book("/works/OL1W", 5.0);
        book.price = None;

        assert!(ledger.purchase(&book).is_none());
        assert_eq!(ledger.transactions().len(), 0);
        assert_eq!(ledger.author_balance, 0.0);
        assert_eq!(ledger.owner_balance, 0.0);
        assert!(!ledger.is_purchased("/works/OL1W"));
    }

    #[test]
    fn purchase_marks_the_key_purchased() {
        let mut ledger = LedgerState::default();
        ledger.purchase(&priced_book("/works/OL1W", 5.0)).expect("purchase");
        assert!(ledger.is_purchased("/works/OL1W"));
        assert!(!ledger.is_purchased("/works/OL2W"));
    }

    #[test]
    fn withdraw_never_mutates_the_ledger() {
        let mut ledger = LedgerState::default();
        assert_eq!(ledger.withdraw(Party::Author), "No funds to withdraw.");

        ledger.purchase(&priced_book("/works/OL1W", 10.0)).expect("purchase");
        let before_author = ledger.author_balance;
        let before_owner = ledger.owner_balance;

        let message = ledger.withdraw(Party::Author);
        assert!(message.starts_with("Withdrawal of $9.50 for Author"));
        let _ = ledger.withdraw(Party::Owner);

        assert_eq!(ledger.author_balance, before_author);
        assert_eq!(ledger.owner_balance, before_owner);
        assert_eq!(ledger.transactions().len(), 1);
    }
}
