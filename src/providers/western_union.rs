use super::best_per_category;
use super::util::{http_client, read_json};
use crate::core::config::EndpointConfig;
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

const NAME: &str = "Western Union";

pub struct WesternUnionProvider {
    config: EndpointConfig,
    scope: QuoteScope,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    services_groups: Option<Vec<ServiceGroup>>,
}

#[derive(Debug, Deserialize)]
struct ServiceGroup {
    #[serde(default)]
    service_name: String,
    #[serde(default)]
    pay_groups: Vec<serde_json::Value>,
}

/// Kept loose: one malformed option must not spoil the whole group.
#[derive(Debug, Deserialize)]
struct PayOption {
    receive_amount: Decimal,
    fx_rate: Decimal,
    #[serde(default)]
    base_fee: Decimal,
}

fn classify_service(service_name: &str) -> Option<PayoutCategory> {
    let name = service_name.to_uppercase();
    if name.contains("BANK") || name.contains("DIRECT") {
        Some(PayoutCategory::BankDeposit)
    } else if name.contains("MINUTES") || name.contains("CASH") || name.contains("MOBILE") {
        Some(PayoutCategory::CashPickup)
    } else {
        None
    }
}

impl WesternUnionProvider {
    pub fn new(config: EndpointConfig, scope: QuoteScope) -> Result<Self, QuoteError> {
        let client = http_client(config.timeout())?;
        Ok(WesternUnionProvider {
            config,
            scope,
            client,
        })
    }

    fn catalog_request(request: &ComparisonRequest) -> serde_json::Value {
        json!({
            "header_request": {"version": "0.5", "request_type": "PRICECATALOG"},
            "sender": {
                "client": "WUCOM",
                "channel": "WWEB",
                "funds_in": "*",
                "curr_iso3": request.send_currency,
                "cty_iso2_ext": request.send_country,
                "send_amount": request.amount.to_string(),
            },
            "receiver": {
                "curr_iso3": request.receive_currency,
                "cty_iso2_ext": request.receive_country,
                "cty_iso2": request.receive_country,
            },
        })
    }

    /// Flattens the catalog into quotes. Groups are tagged by service name
    /// when `classify` is set, and dropped when they match no category.
    fn collect_options(groups: Vec<ServiceGroup>, classify: bool) -> Vec<Quote> {
        let mut quotes = Vec::new();
        for group in groups {
            let category = if classify {
                match classify_service(&group.service_name) {
                    Some(category) => category,
                    None => {
                        debug!(service = %group.service_name, "Skipping unclassified service");
                        continue;
                    }
                }
            } else {
                PayoutCategory::Other
            };

            for raw in group.pay_groups {
                match serde_json::from_value::<PayOption>(raw) {
                    Ok(option) => quotes.push(Quote::new(
                        NAME,
                        category,
                        option.fx_rate,
                        option.base_fee,
                        option.receive_amount,
                    )),
                    Err(e) => debug!(error = %e, "Skipping malformed pay option"),
                }
            }
        }
        quotes
    }
}

#[async_trait]
impl QuoteProvider for WesternUnionProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    #[instrument(name = "WesternUnionQuote", skip(self, request))]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        let url = format!(
            "{}/wuconnect/prices/catalog",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("Requesting price catalog from {}", url);

        let response = self
            .client
            .post(&url)
            .header("Origin", "https://www.westernunion.com")
            .json(&Self::catalog_request(request))
            .send()
            .await?;
        let catalog: CatalogResponse = read_json(response).await?;
        let groups = catalog
            .services_groups
            .ok_or_else(|| QuoteError::Schema("missing services_groups".to_string()))?;

        // Zero-rate options carry no data and would otherwise win on amount.
        let candidates = Self::collect_options(groups, self.scope == QuoteScope::PerCategory)
            .into_iter()
            .filter(Quote::is_valid);

        Ok(match self.scope {
            QuoteScope::Best => candidates
                .fold(None::<Quote>, |best, quote| match best {
                    Some(b) if b.recipient_gets >= quote.recipient_gets => Some(b),
                    _ => Some(quote),
                })
                .into_iter()
                .collect(),
            QuoteScope::PerCategory => best_per_category(candidates.collect()),
        })
    }
}
