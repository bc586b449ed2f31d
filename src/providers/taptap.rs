use super::snapshot::{CorridorRates, load_snapshot};
use super::util::{http_client, read_json};
use crate::core::config::TapTapConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::{ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

const NAME: &str = "TapTap Send";

/// Rates come from the live corridor listing, then a captured snapshot of it,
/// then the mid-market reference. Fees come from a fixed table.
pub struct TapTapProvider {
    config: TapTapConfig,
    snapshot_path: Option<PathBuf>,
    client: Client,
    reference: Option<Arc<dyn CurrencyRateProvider>>,
}

impl TapTapProvider {
    pub fn new(
        config: TapTapConfig,
        snapshot_path: Option<PathBuf>,
        reference: Option<Arc<dyn CurrencyRateProvider>>,
    ) -> Result<Self, QuoteError> {
        let client = http_client(Duration::from_secs(config.request_timeout_secs))?;
        Ok(TapTapProvider {
            config,
            snapshot_path,
            client,
            reference,
        })
    }

    async fn live_rates(&self) -> Result<CorridorRates, QuoteError> {
        let url = format!("{}/api/fxRates", self.config.base_url.trim_end_matches('/'));
        debug!("Requesting corridor rates from {}", url);
        let response = self.client.get(&url).send().await?;
        read_json(response).await
    }

    async fn resolve_rate(&self, request: &ComparisonRequest) -> Option<Decimal> {
        let find = |rates: &CorridorRates| {
            rates.find_rate(
                &request.send_country,
                &request.receive_country,
                &request.receive_currency,
            )
        };

        match self.live_rates().await {
            Ok(rates) => {
                if let Some(rate) = find(&rates) {
                    return Some(rate);
                }
                debug!("Corridor missing from live listing");
            }
            Err(e) => debug!(error = %e, "Live corridor listing unavailable"),
        }

        if let Some(rate) = self
            .snapshot_path
            .as_deref()
            .and_then(load_snapshot)
            .and_then(|rates| find(&rates))
        {
            debug!("Using corridor rate from snapshot");
            return Some(rate);
        }

        let Some(reference) = &self.reference else {
            debug!("Mid-market reference disabled");
            return None;
        };
        match reference
            .get_rate(&request.send_currency, &request.receive_currency)
            .await
        {
            Ok(rate) if rate > Decimal::ZERO => {
                debug!("Using mid-market rate as an approximation");
                Some(rate)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "Mid-market reference unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl QuoteProvider for TapTapProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    #[instrument(
        name = "TapTapQuote",
        skip(self, request),
        fields(send = %request.send_country, receive = %request.receive_country)
    )]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        let fee = self
            .config
            .fee_for(&request.send_country, &request.receive_country);

        let rate = self.resolve_rate(request).await.ok_or_else(|| {
            QuoteError::NoOffer(format!(
                "no rate for {}->{}",
                request.send_currency, request.receive_currency
            ))
        })?;

        // The full principal is converted and the fee charged on top.
        let recipient_gets = request
            .amount
            .checked_mul(rate)
            .ok_or_else(|| QuoteError::Schema(format!("rate {rate} overflows amount")))?;

        Ok(vec![Quote::new(
            NAME,
            PayoutCategory::CashPickup,
            rate,
            fee,
            recipient_gets,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedRate(Option<Decimal>);

    #[async_trait]
    impl CurrencyRateProvider for FixedRate {
        async fn get_rate(&self, _from: &str, _to: &str) -> anyhow::Result<Decimal> {
            self.0.ok_or_else(|| anyhow!("reference down"))
        }
    }

    const LISTING: &str = r#"{"availableCountries": [{"isoCountryCode": "US", "corridors": [
        {"isoCountryCode": "MA", "currency": "MAD", "fxRate": 10.05}
    ]}]}"#;

    async fn create_mock_server(body: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/fxRates"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(
        server: &MockServer,
        snapshot_path: Option<PathBuf>,
        reference: Option<Decimal>,
    ) -> TapTapProvider {
        let config = TapTapConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        let reference: Arc<dyn CurrencyRateProvider> = Arc::new(FixedRate(reference));
        TapTapProvider::new(config, snapshot_path, Some(reference)).unwrap()
    }

    #[tokio::test]
    async fn test_live_corridor_rate() {
        let mock_server = create_mock_server(LISTING, 200).await;
        let provider = provider(&mock_server, None, None);

        let quotes = provider
            .fetch_quotes(&ComparisonRequest::default())
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
        let quote = &quotes[0];
        assert_eq!(quote.provider, "TapTap Send");
        assert_eq!(quote.category, PayoutCategory::CashPickup);
        assert_eq!(quote.rate, Decimal::new(1005, 2));
        assert_eq!(quote.fee, Decimal::new(299, 2));
        assert_eq!(quote.recipient_gets, Decimal::new(1005, 0));
    }

    #[tokio::test]
    async fn test_snapshot_used_when_live_listing_fails() {
        let mock_server = create_mock_server("blocked", 403).await;
        let temp_dir = TempDir::new().unwrap();
        let snapshot = temp_dir.path().join("taptap_data.json");
        fs::write(&snapshot, LISTING).unwrap();

        let provider = provider(&mock_server, Some(snapshot), Some(Decimal::new(9, 0)));
        let quotes = provider
            .fetch_quotes(&ComparisonRequest::default())
            .await
            .unwrap();
        assert_eq!(quotes[0].rate, Decimal::new(1005, 2));
    }

    #[tokio::test]
    async fn test_mid_market_used_when_other_sources_fail() {
        let mock_server = create_mock_server("blocked", 403).await;
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("taptap_data.json");

        let provider = provider(&mock_server, Some(missing), Some(Decimal::new(99123, 4)));
        let request =
            ComparisonRequest::new(Decimal::new(250, 0), "USD", "MAD", "US", "MA").unwrap();
        let quotes = provider.fetch_quotes(&request).await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].rate, Decimal::new(99123, 4));
        assert_eq!(
            quotes[0].recipient_gets,
            Decimal::new(250, 0) * Decimal::new(99123, 4)
        );
    }

    #[tokio::test]
    async fn test_corridor_missing_from_listing_falls_through() {
        let mock_server = create_mock_server(LISTING, 200).await;
        let provider = provider(&mock_server, None, Some(Decimal::new(57, 0)));
        let request =
            ComparisonRequest::new(Decimal::new(100, 0), "USD", "PHP", "US", "PH").unwrap();

        let quotes = provider.fetch_quotes(&request).await.unwrap();
        assert_eq!(quotes[0].rate, Decimal::new(57, 0));
        assert_eq!(quotes[0].recipient_gets, Decimal::new(5700, 0));
    }

    #[tokio::test]
    async fn test_no_rate_anywhere_is_no_offer() {
        let mock_server = create_mock_server("{}", 200).await;
        let provider = provider(&mock_server, None, None);

        let result = provider.fetch_quotes(&ComparisonRequest::default()).await;
        assert!(matches!(result, Err(QuoteError::NoOffer(_))));
    }

    #[tokio::test]
    async fn test_zero_reference_rate_is_no_offer() {
        let mock_server = create_mock_server("{}", 200).await;
        let provider = provider(&mock_server, None, Some(Decimal::ZERO));

        let result = provider.fetch_quotes(&ComparisonRequest::default()).await;
        assert!(matches!(result, Err(QuoteError::NoOffer(_))));
    }

    #[tokio::test]
    async fn test_disabled_reference_is_not_consulted() {
        let mock_server = create_mock_server("blocked", 403).await;
        let config = TapTapConfig {
            base_url: mock_server.uri(),
            ..Default::default()
        };
        let provider = TapTapProvider::new(config, None, None).unwrap();

        let result = provider.fetch_quotes(&ComparisonRequest::default()).await;
        assert!(matches!(result, Err(QuoteError::NoOffer(_))));
    }
}
