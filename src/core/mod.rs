//! Core business logic abstractions

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod country;
pub mod currency;
pub mod log;
pub mod quote;
pub mod ranking;

// Re-export main types for cleaner imports
pub use currency::CurrencyRateProvider;
pub use quote::{
    ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider, QuoteScope,
    RequestError,
};
