//! Quote abstractions and core types

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Payout channel through which the recipient accesses the funds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutCategory {
    BankDeposit,
    CashPickup,
    #[default]
    Other,
}

impl PayoutCategory {
    pub fn is_other(&self) -> bool {
        matches!(self, PayoutCategory::Other)
    }
}

impl Display for PayoutCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PayoutCategory::BankDeposit => "Bank deposit",
                PayoutCategory::CashPickup => "Cash pickup",
                PayoutCategory::Other => "Other",
            }
        )
    }
}

/// How many quotes a multi-option provider reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteScope {
    /// A single best offer per provider.
    Best,
    /// The best offer for each payout category the provider supports.
    #[default]
    PerCategory,
}

impl FromStr for QuoteScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "best" => Ok(QuoteScope::Best),
            "per_category" => Ok(QuoteScope::PerCategory),
            _ => Err(anyhow::anyhow!("Invalid quote scope: {}", s)),
        }
    }
}

/// A normalized price estimate reported by (or derived for) one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub provider: String,
    #[serde(default, skip_serializing_if = "PayoutCategory::is_other")]
    pub category: PayoutCategory,
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub recipient_gets: Decimal,
}

impl Quote {
    pub fn new(
        provider: impl Into<String>,
        category: PayoutCategory,
        rate: Decimal,
        fee: Decimal,
        recipient_gets: Decimal,
    ) -> Self {
        Self {
            provider: provider.into(),
            category,
            rate,
            fee,
            recipient_gets,
        }
    }

    /// A zero rate means "no data" and must never be reported.
    pub fn is_valid(&self) -> bool {
        self.rate > Decimal::ZERO
            && self.recipient_gets > Decimal::ZERO
            && self.fee >= Decimal::ZERO
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("Invalid currency code: '{0}' (expected three letters)")]
    InvalidCurrency(String),
    #[error("Invalid country code: '{0}' (expected two letters)")]
    InvalidCountry(String),
}

/// One comparison call: how much to send and along which corridor.
///
/// Codes are stored uppercased. Providers that need other spellings
/// (lowercase, alpha-3) derive them locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRequest {
    pub amount: Decimal,
    pub send_currency: String,
    pub receive_currency: String,
    pub send_country: String,
    pub receive_country: String,
}

impl ComparisonRequest {
    pub fn new(
        amount: Decimal,
        send_currency: &str,
        receive_currency: &str,
        send_country: &str,
        receive_country: &str,
    ) -> Result<Self, RequestError> {
        if amount <= Decimal::ZERO {
            return Err(RequestError::NonPositiveAmount(amount));
        }

        Ok(Self {
            amount,
            send_currency: parse_code(send_currency, 3).map_err(RequestError::InvalidCurrency)?,
            receive_currency: parse_code(receive_currency, 3)
                .map_err(RequestError::InvalidCurrency)?,
            send_country: parse_code(send_country, 2).map_err(RequestError::InvalidCountry)?,
            receive_country: parse_code(receive_country, 2).map_err(RequestError::InvalidCountry)?,
        })
    }
}

impl Default for ComparisonRequest {
    fn default() -> Self {
        Self {
            amount: Decimal::ONE_HUNDRED,
            send_currency: "USD".to_string(),
            receive_currency: "MAD".to_string(),
            send_country: "US".to_string(),
            receive_country: "MA".to_string(),
        }
    }
}

fn parse_code(code: &str, len: usize) -> Result<String, String> {
    let code = code.trim();
    if code.len() == len && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_uppercase())
    } else {
        Err(code.to_string())
    }
}

/// Why a provider produced no quotes. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Unexpected response: {0}")]
    Schema(String),
    #[error("No offer: {0}")]
    NoOffer(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for QuoteError {
    fn from(e: serde_json::Error) -> Self {
        QuoteError::Schema(e.to_string())
    }
}

/// One external remittance provider.
///
/// `fetch_quotes` reports its own failure; the aggregator is responsible for
/// bounding it by `timeout` and turning any error into an empty result.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration;

    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError>;
}
