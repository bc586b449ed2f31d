//! Ordering and grouping of collected quotes.
use crate::core::quote::{PayoutCategory, Quote};
use serde::Serialize;

/// Quotes split by payout channel, each list ranked best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedQuotes {
    pub bank_deposit: Vec<Quote>,
    pub cash_pickup: Vec<Quote>,
}

impl CategorizedQuotes {
    pub fn is_empty(&self) -> bool {
        self.bank_deposit.is_empty() && self.cash_pickup.is_empty()
    }

    /// Sections in display order.
    pub fn sections(&self) -> [(PayoutCategory, &[Quote]); 2] {
        [
            (PayoutCategory::BankDeposit, self.bank_deposit.as_slice()),
            (PayoutCategory::CashPickup, self.cash_pickup.as_slice()),
        ]
    }
}

/// Sorts by amount received, highest first. Equal amounts keep their input order.
pub fn rank(mut quotes: Vec<Quote>) -> Vec<Quote> {
    quotes.sort_by(|a, b| b.recipient_gets.cmp(&a.recipient_gets));
    quotes
}

/// Groups quotes into bank deposit and cash pickup. Quotes without a known
/// category appear in neither group.
pub fn partition(quotes: &[Quote]) -> CategorizedQuotes {
    let of = |category: PayoutCategory| {
        rank(
            quotes
                .iter()
                .filter(|quote| quote.category == category)
                .cloned()
                .collect(),
        )
    };

    CategorizedQuotes {
        bank_deposit: of(PayoutCategory::BankDeposit),
        cash_pickup: of(PayoutCategory::CashPickup),
    }
}
