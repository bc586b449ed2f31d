use super::util::{http_client, with_retry};
use crate::core::cache::Cache;
use crate::core::config::EndpointConfig;
use crate::core::currency::CurrencyRateProvider;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Reference tables are refreshed at most hourly upstream.
const RATES_TTL: Duration = Duration::from_secs(60 * 60);

/// Public mid-market reference rates, keyed by source currency.
pub struct MidMarketRateProvider {
    base_url: String,
    client: Client,
    cache: Arc<Cache<String, HashMap<String, Decimal>>>,
}

impl MidMarketRateProvider {
    pub fn new(
        config: &EndpointConfig,
        cache: Arc<Cache<String, HashMap<String, Decimal>>>,
    ) -> Result<Self> {
        Ok(MidMarketRateProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: http_client(config.timeout())?,
            cache,
        })
    }

    async fn rates_for(&self, base: &str) -> Result<HashMap<String, Decimal>> {
        if let Some(cached) = self.cache.get(&base.to_string()).await {
            return Ok(cached);
        }

        let url = format!("{}/v6/latest/{}", self.base_url, base);
        debug!("Requesting reference rates from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), 1, 200)
            .await
            .with_context(|| format!("Failed to send request for currency: {base}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for currency: {}",
                response.status(),
                base
            ));
        }

        let data: ReferenceRates = response
            .json()
            .await
            .with_context(|| format!("Failed to parse reference rates for currency: {base}"))?;

        self.cache
            .put(base.to_string(), data.rates.clone(), Some(RATES_TTL))
            .await;
        Ok(data.rates)
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceRates {
    rates: HashMap<String, Decimal>,
}

#[async_trait]
impl CurrencyRateProvider for MidMarketRateProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let rates = self.rates_for(&from).await?;
        rates
            .get(&to)
            .copied()
            .ok_or_else(|| anyhow!("No reference rate for currency pair: {}{}", from, to))
    }
}
