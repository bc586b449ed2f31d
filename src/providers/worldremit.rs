use super::util::{http_client, read_json};
use crate::core::config::WorldRemitConfig;
use crate::core::{
    ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider, QuoteScope,
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

const NAME: &str = "WorldRemit";

const CALCULATION_MUTATION: &str = "mutation createCalculation($amount: BigDecimal!, $type: CalculationType!, $sendCountryCode: CountryCode!, $sendCurrencyCode: CurrencyCode!, $receiveCountryCode: CountryCode!, $receiveCurrencyCode: CurrencyCode!, $payOutMethodCode: String, $correspondentId: String) { createCalculation(calculationInput: {amount: $amount, send: {country: $sendCountryCode, currency: $sendCurrencyCode}, type: $type, receive: {country: $receiveCountryCode, currency: $receiveCurrencyCode}, payOutMethodCode: $payOutMethodCode, correspondentId: $correspondentId}) { calculation { id informativeSummary { fee { value { amount currency } } } receive { amount currency } exchangeRate { value } } errors { message } } }";

pub struct WorldRemitProvider {
    config: WorldRemitConfig,
    scope: QuoteScope,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<CalculationData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculationData {
    create_calculation: Option<CreateCalculation>,
}

#[derive(Debug, Deserialize)]
struct CreateCalculation {
    calculation: Option<Calculation>,
    #[serde(default)]
    errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Calculation {
    informative_summary: Option<InformativeSummary>,
    receive: Option<Amount>,
    exchange_rate: Option<ExchangeRate>,
}

#[derive(Debug, Deserialize)]
struct InformativeSummary {
    fee: Option<Fee>,
}

#[derive(Debug, Deserialize)]
struct Fee {
    value: Option<Amount>,
}

#[derive(Debug, Deserialize)]
struct Amount {
    amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRate {
    value: Option<Decimal>,
}

fn join_messages(errors: &[ApiError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorldRemitProvider {
    pub fn new(config: WorldRemitConfig, scope: QuoteScope) -> Result<Self, QuoteError> {
        let client = http_client(Duration::from_secs(config.timeout_secs))?;
        Ok(WorldRemitProvider {
            config,
            scope,
            client,
        })
    }

    fn category_for(&self, method: &str) -> PayoutCategory {
        if method.eq_ignore_ascii_case(&self.config.bank_method) {
            PayoutCategory::BankDeposit
        } else {
            PayoutCategory::CashPickup
        }
    }

    /// Application-level errors come back as `NoOffer` so the caller can move
    /// on to the next payout method.
    async fn calculate(
        &self,
        request: &ComparisonRequest,
        method: &str,
    ) -> Result<Quote, QuoteError> {
        let url = format!("{}/graphql", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "query": CALCULATION_MUTATION,
            "variables": {
                "amount": request.amount.to_string(),
                "type": "SEND",
                "sendCountryCode": request.send_country,
                "sendCurrencyCode": request.send_currency,
                "receiveCountryCode": request.receive_country,
                "receiveCurrencyCode": request.receive_currency,
                "payOutMethodCode": method,
                "correspondentId": null,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("Origin", "https://www.worldremit.com")
            .json(&body)
            .send()
            .await?;
        let data: GraphQlResponse = read_json(response).await?;

        if !data.errors.is_empty() {
            return Err(QuoteError::NoOffer(join_messages(&data.errors)));
        }

        let created = data
            .data
            .and_then(|d| d.create_calculation)
            .ok_or_else(|| QuoteError::Schema("missing createCalculation".to_string()))?;

        if let Some(errors) = created.errors.filter(|errors| !errors.is_empty()) {
            return Err(QuoteError::NoOffer(join_messages(&errors)));
        }

        let calculation = created
            .calculation
            .ok_or_else(|| QuoteError::NoOffer(format!("no calculation for {method}")))?;

        let rate = calculation
            .exchange_rate
            .and_then(|rate| rate.value)
            .ok_or_else(|| QuoteError::Schema("missing exchangeRate".to_string()))?;
        let recipient_gets = calculation
            .receive
            .and_then(|receive| receive.amount)
            .ok_or_else(|| QuoteError::Schema("missing receive amount".to_string()))?;
        let fee = calculation
            .informative_summary
            .and_then(|summary| summary.fee)
            .and_then(|fee| fee.value)
            .and_then(|value| value.amount)
            .unwrap_or(Decimal::ZERO);

        Ok(Quote::new(
            format!("{NAME} ({method})"),
            self.category_for(method),
            rate,
            fee,
            recipient_gets,
        ))
    }
}

#[async_trait]
impl QuoteProvider for WorldRemitProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    #[instrument(name = "WorldRemitQuote", skip(self, request))]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        let mut quotes = Vec::new();
        let mut last_error = None;

        for method in &self.config.methods {
            match self.calculate(request, method).await {
                Ok(quote) if quote.is_valid() => {
                    quotes.push(quote);
                    if self.scope == QuoteScope::Best {
                        break;
                    }
                }
                Ok(_) => {
                    debug!(method = %method, "Discarding zero quote");
                }
                Err(e) => {
                    debug!(method = %method, error = %e, "Payout method unavailable");
                    last_error = Some(e);
                }
            }
        }

        match (quotes.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(quotes),
        }
    }
}
