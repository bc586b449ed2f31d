use super::best_per_category;
use super::util::{http_client, read_json};
use crate::core::config::SendwaveConfig;
use crate::core::{
    ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider, QuoteScope,
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const NAME: &str = "Sendwave";

pub struct SendwaveProvider {
    config: SendwaveConfig,
    scope: QuoteScope,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingResponse {
    effective_exchange_rate: Option<Decimal>,
    effective_fee_amount: Option<Decimal>,
    receive_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentsResponse {
    #[serde(default)]
    payout_methods_and_prices: Vec<PayoutMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayoutMethod {
    #[serde(default)]
    label: String,
    best_priced_segment_name: Option<String>,
}

/// Classifies a payout-method label. Wallets are collected at the same
/// points as cash.
fn classify_label(label: &str) -> Option<PayoutCategory> {
    if label.contains("Cash Pickup") {
        Some(PayoutCategory::CashPickup)
    } else if label.contains("Bank Account") {
        Some(PayoutCategory::BankDeposit)
    } else if label.contains("Wallet") || label.contains("Mobile") {
        Some(PayoutCategory::CashPickup)
    } else {
        None
    }
}

impl SendwaveProvider {
    pub fn new(config: SendwaveConfig, scope: QuoteScope) -> Result<Self, QuoteError> {
        let client = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(SendwaveProvider {
            config,
            scope,
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/v2/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    async fn price_segment(
        &self,
        request: &ComparisonRequest,
        segment: &str,
        category: PayoutCategory,
    ) -> Result<Quote, QuoteError> {
        let amount = request.amount.to_string();
        let send_country = request.send_country.to_lowercase();
        let receive_country = request.receive_country.to_lowercase();
        let query = [
            ("amountType", "SEND"),
            ("receiveCurrency", request.receive_currency.as_str()),
            ("segmentName", segment),
            ("amount", amount.as_str()),
            ("sendCurrency", request.send_currency.as_str()),
            ("sendCountryIso2", send_country.as_str()),
            ("receiveCountryIso2", receive_country.as_str()),
        ];

        debug!(segment, "Requesting Sendwave pricing");
        let response = self
            .client
            .get(self.url("pricing-public"))
            .query(&query)
            .send()
            .await?;
        let pricing: PricingResponse = read_json(response).await?;

        let rate = pricing
            .effective_exchange_rate
            .ok_or_else(|| QuoteError::NoOffer(format!("no rate for segment {segment}")))?;
        let fee = pricing
            .effective_fee_amount
            .ok_or_else(|| QuoteError::Schema("missing effectiveFeeAmount".to_string()))?;
        let recipient_gets = pricing
            .receive_amount
            .ok_or_else(|| QuoteError::Schema("missing receiveAmount".to_string()))?;

        let quote = Quote::new(NAME, category, rate, fee, recipient_gets);
        if !quote.is_valid() {
            return Err(QuoteError::NoOffer(format!("unusable price for segment {segment}")));
        }
        Ok(quote)
    }

    async fn discover_segments(
        &self,
        request: &ComparisonRequest,
    ) -> Result<Vec<(String, PayoutCategory)>, QuoteError> {
        let send_country = request.send_country.to_lowercase();
        let receive_country = request.receive_country.to_lowercase();
        let query = [
            ("sendCountryIso2", send_country.as_str()),
            ("sendCurrency", request.send_currency.as_str()),
            ("receiveCountryIso2", receive_country.as_str()),
            ("receiveCurrency", request.receive_currency.as_str()),
        ];

        let response = self
            .client
            .get(self.url("pricing-segments"))
            .header("Accept", "application/json")
            .query(&query)
            .send()
            .await?;
        let listing: SegmentsResponse = read_json(response).await?;

        Ok(listing
            .payout_methods_and_prices
            .into_iter()
            .filter_map(|method| {
                let segment = method.best_priced_segment_name.filter(|s| !s.is_empty())?;
                let category = classify_label(&method.label)?;
                Some((segment, category))
            })
            .collect())
    }
}

#[async_trait]
impl QuoteProvider for SendwaveProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    #[instrument(name = "SendwaveQuote", skip(self, request))]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        match self.scope {
            QuoteScope::Best => {
                let segment = self.config.segment_for(&request.receive_country);
                let quote = self
                    .price_segment(request, segment, PayoutCategory::Other)
                    .await?;
                Ok(vec![quote])
            }
            QuoteScope::PerCategory => {
                let segments = self.discover_segments(request).await?;
                debug!(count = segments.len(), "Discovered Sendwave segments");

                let mut quotes = Vec::new();
                for (segment, category) in &segments {
                    match self.price_segment(request, segment, *category).await {
                        Ok(quote) => quotes.push(quote),
                        Err(e) => debug!(segment = %segment, error = %e, "Skipping segment"),
                    }
                }
                Ok(best_per_category(quotes))
            }
        }
    }
}
