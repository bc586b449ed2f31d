use super::util::{http_client, read_json};
use crate::core::config::EndpointConfig;
use crate::core::{ComparisonRequest, PayoutCategory, Quote, QuoteError, QuoteProvider};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const NAME: &str = "Wise";
const ALIAS: &str = "wise";

/// Reads Wise's own entry out of its public competitor comparison.
pub struct WiseProvider {
    config: EndpointConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ComparisonResponse {
    providers: Option<Vec<ComparedProvider>>,
}

#[derive(Debug, Deserialize)]
struct ComparedProvider {
    alias: Option<String>,
    #[serde(default)]
    quotes: Vec<ComparedQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComparedQuote {
    rate: Option<Decimal>,
    fee: Option<Decimal>,
    received_amount: Option<Decimal>,
}

impl WiseProvider {
    pub fn new(config: EndpointConfig) -> Result<Self, QuoteError> {
        let client = http_client(config.timeout())?;
        Ok(WiseProvider { config, client })
    }
}

#[async_trait]
impl QuoteProvider for WiseProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    // The comparison endpoint has no receive-country parameter.
    #[instrument(name = "WiseQuote", skip(self, request))]
    async fn fetch_quotes(&self, request: &ComparisonRequest) -> Result<Vec<Quote>, QuoteError> {
        let url = format!(
            "{}/gateway/v4/comparisons",
            self.config.base_url.trim_end_matches('/')
        );
        let amount = request.amount.to_string();
        debug!("Requesting comparison from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Origin", "https://wise.com")
            .query(&[
                ("sendAmount", amount.as_str()),
                ("sourceCurrency", request.send_currency.as_str()),
                ("targetCurrency", request.receive_currency.as_str()),
                ("sourceCountry", request.send_country.as_str()),
                ("filter", "POPULAR"),
                ("includeWise", "true"),
                ("payInMethod", "DIRECT_DEBIT"),
            ])
            .send()
            .await?;
        let comparison: ComparisonResponse = read_json(response).await?;

        let own = comparison
            .providers
            .ok_or_else(|| QuoteError::Schema("missing providers".to_string()))?
            .into_iter()
            .find(|provider| provider.alias.as_deref() == Some(ALIAS))
            .ok_or_else(|| QuoteError::NoOffer("wise not listed in comparison".to_string()))?;

        let quote = own
            .quotes
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::NoOffer("wise listed without quotes".to_string()))?;

        let rate = quote
            .rate
            .ok_or_else(|| QuoteError::Schema("missing rate".to_string()))?;
        let recipient_gets = quote
            .received_amount
            .ok_or_else(|| QuoteError::Schema("missing receivedAmount".to_string()))?;

        let quote = Quote::new(
            NAME,
            PayoutCategory::BankDeposit,
            rate,
            quote.fee.unwrap_or(Decimal::ZERO),
            recipient_gets,
        );
        if !quote.is_valid() {
            return Err(QuoteError::NoOffer(format!("unusable wise quote at rate {rate}")));
        }
        Ok(vec![quote])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(body: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gateway/v4/comparisons"))
            .and(query_param("sendAmount", "100"))
            .and(query_param("sourceCurrency", "USD"))
            .and(query_param("targetCurrency", "MAD"))
            .and(query_param("sourceCountry", "US"))
            .and(query_param("includeWise", "true"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> WiseProvider {
        WiseProvider::new(EndpointConfig {
            enabled: true,
            base_url: server.uri(),
            timeout_secs: 10,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_picks_own_entry_first_quote() {
        let body = r#"{"sourceCurrency": "USD", "providers": [
            {"alias": "western-union", "quotes": [{"rate": 9.7, "fee": 5, "receivedAmount": 921.5}]},
            {"alias": "wise", "quotes": [
                {"rate": 9.9832, "fee": 4.11, "receivedAmount": 957.29},
                {"rate": 9.9832, "fee": 1.0, "receivedAmount": 988.3}
            ]}
        ]}"#;
        let mock_server = create_mock_server(body, 200).await;

        let quotes = provider(&mock_server)
            .fetch_quotes(&ComparisonRequest::default())
            .await
            .unwrap();
        assert_eq!(
            quotes,
            vec![Quote::new(
                "Wise",
                PayoutCategory::BankDeposit,
                Decimal::new(99832, 4),
                Decimal::new(411, 2),
                Decimal::new(95729, 2),
            )]
        );
    }

    #[tokio::test]
    async fn test_not_listed_is_no_offer() {
        let body = r#"{"providers": [{"alias": "remitly", "quotes": []}]}"#;
        let mock_server = create_mock_server(body, 200).await;

        let result = provider(&mock_server)
            .fetch_quotes(&ComparisonRequest::default())
            .await;
        assert!(matches!(result, Err(QuoteError::NoOffer(_))));
    }

    #[tokio::test]
    async fn test_missing_rate_is_schema_error() {
        let body = r#"{"providers": [{"alias": "wise", "quotes": [{"fee": 4.11, "receivedAmount": 957.29}]}]}"#;
        let mock_server = create_mock_server(body, 200).await;

        let result = provider(&mock_server)
            .fetch_quotes(&ComparisonRequest::default())
            .await;
        assert!(matches!(result, Err(QuoteError::Schema(_))));
    }

    #[tokio::test]
    async fn test_zero_rate_is_no_offer() {
        let body = r#"{"providers": [{"alias": "wise", "quotes": [{"rate": 0, "fee": 0, "receivedAmount": 1200}]}]}"#;
        let mock_server = create_mock_server(body, 200).await;

        let result = provider(&mock_server)
            .fetch_quotes(&ComparisonRequest::default())
            .await;
        assert!(matches!(result, Err(QuoteError::NoOffer(_))));
    }

    #[tokio::test]
    async fn test_http_error() {
        let mock_server = create_mock_server("", 500).await;
        let result = provider(&mock_server)
            .fetch_quotes(&ComparisonRequest::default())
            .await;
        assert!(matches!(result, Err(QuoteError::Status { status: 500, .. })));
    }
}
