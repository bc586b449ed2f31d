use super::util::{http_client, read_json};
use crate::core::config::EndpointConfig;
use crate::core::country::to_alpha3;
use crate::core::{ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const NAME: &str = "Remitly";

pub struct RemitlyProvider {
    config: EndpointConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    pay_out_price_estimates: Option<PriceEstimates>,
}

#[derive(Debug, Deserialize)]
struct PriceEstimates {
    #[serde(default)]
    estimates: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Estimate {
    receive_amount: Decimal,
    exchange_rate: ExchangeRate,
    fee: Option<EstimateFee>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRate {
    promotional_exchange_rate: Option<Decimal>,
    base_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct EstimateFee {
    total_fee_amount: Option<Decimal>,
}

impl Estimate {
    /// Promotional pricing wins when offered.
    fn rate(&self) -> Option<Decimal> {
        self.exchange_rate
            .promotional_exchange_rate
            .filter(|rate| !rate.is_zero())
            .or(self.exchange_rate.base_rate)
    }

    fn into_quote(self) -> Option<Quote> {
        let rate = self.rate()?;
        let fee = self
            .fee
            .and_then(|fee| fee.total_fee_amount)
            .unwrap_or(Decimal::ZERO);
        Some(Quote::new(
            NAME,
            PayoutCategory::CashPickup,
            rate,
            fee,
            self.receive_amount,
        ))
    }
}

/// `USA:USD-MAR:MAD` style corridor key.
pub fn conduit(request: &ComparisonRequest) -> String {
    format!(
        "{}:{}-{}:{}",
        to_alpha3(&request.send_country),
        request.send_currency.to_uppercase(),
        to_alpha3(&request.receive_country),
        request.receive_currency.to_uppercase()
    )
}

impl RemitlyProvider {
    pub fn new(config: EndpointConfig) -> Result<Self, QuoteError> {
        let client = http_client(config.timeout())?;
        Ok(RemitlyProvider { config, client })
    }
}

#[async_trait]
impl QuoteProvider for RemitlyProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    #[instrument(name = "RemitlyQuote", skip(self, request))]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        let url = format!(
            "{}/v3/calculator/estimate",
            self.config.base_url.trim_end_matches('/')
        );
        let conduit = conduit(request);
        let amount = request.amount.to_string();
        debug!(conduit = %conduit, "Requesting Remitly estimate");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("conduit", conduit.as_str()),
                ("anchor", "SEND"),
                ("amount", amount.as_str()),
                ("purpose", "OTHER"),
                ("customer_segment", "UNRECOGNIZED"),
                ("strict_promo", "false"),
            ])
            .send()
            .await?;
        let data: EstimateResponse = read_json(response).await?;
        let estimates = data
            .pay_out_price_estimates
            .ok_or_else(|| QuoteError::Schema("missing pay_out_price_estimates".to_string()))?
            .estimates;

        let best = estimates
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Estimate>(raw) {
                Ok(estimate) => estimate.into_quote(),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed estimate");
                    None
                }
            })
            .filter(Quote::is_valid)
            .fold(None::<Quote>, |best, quote| match best {
                Some(b) if b.recipient_gets >= quote.recipient_gets => Some(b),
                _ => Some(quote),
            });

        best.map(|quote| vec![quote])
            .ok_or_else(|| QuoteError::NoOffer(format!("no usable estimate for {conduit}")))
    }
}
