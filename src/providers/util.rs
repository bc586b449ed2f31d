use crate::core::QuoteError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Several pricing endpoints reject non-browser agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Builds the client a provider uses for all of its calls.
pub fn http_client(timeout: Duration) -> Result<Client, QuoteError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Checks the status and decodes the body, keeping transport and schema
/// failures apart.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, QuoteError> {
    let status = response.status();
    let url = response.url().to_string();
    if !status.is_success() {
        return Err(QuoteError::Status {
            status: status.as_u16(),
            url,
        });
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Err(QuoteError::Schema(format!("Received empty response from {url}")));
    }

    serde_json::from_str(&text)
        .map_err(|e| QuoteError::Schema(format!("Failed to parse response from {url}: {e}")))
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: u32,
    }

    async fn respond(status: u16, body: &str) -> (MockServer, Response) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payload"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        let client = http_client(Duration::from_secs(5)).unwrap();
        let response = client
            .get(format!("{}/payload", mock_server.uri()))
            .send()
            .await
            .unwrap();
        (mock_server, response)
    }

    #[tokio::test]
    async fn test_read_json_success() {
        let (_server, response) = respond(200, r#"{"value": 42}"#).await;
        let payload: Payload = read_json(response).await.unwrap();
        assert_eq!(payload.value, 42);
    }

    #[tokio::test]
    async fn test_read_json_status_error() {
        let (_server, response) = respond(429, "slow down").await;
        let result: Result<Payload, _> = read_json(response).await;
        assert!(matches!(result, Err(QuoteError::Status { status: 429, .. })));
    }

    #[tokio::test]
    async fn test_read_json_empty_and_malformed() {
        let (_server, response) = respond(200, "  ").await;
        let result: Result<Payload, _> = read_json(response).await;
        assert!(
            matches!(result, Err(QuoteError::Schema(msg))
                if msg.starts_with("Received empty response"))
        );

        let (_server, response) = respond(200, r#"{"other": 1}"#).await;
        let result: Result<Payload, _> = read_json(response).await;
        assert!(matches!(result, Err(QuoteError::Schema(_))));
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_after_retries() {
        let client = http_client(Duration::from_millis(200)).unwrap();
        let mut calls = 0;
        let result = with_retry(
            || {
                calls += 1;
                // Nothing listens on port 1
                client.get("http://127.0.0.1:1/").send()
            },
            2,
            1,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
