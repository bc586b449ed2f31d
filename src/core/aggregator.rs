//! Fans a comparison request out to every provider and merges what comes back.
use crate::core::quote::{ComparisonRequest, Quote, QuoteError, QuoteProvider};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub struct QuoteAggregator {
    providers: Vec<Arc<dyn QuoteProvider>>,
}

impl QuoteAggregator {
    pub fn new(providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn compare(&self, request: &ComparisonRequest) -> Vec<Quote> {
        self.compare_with_progress(request, &|| {}).await
    }

    /// Queries all providers concurrently. Results are merged in provider
    /// order, not completion order, so ties rank the same way on every run.
    /// `on_settled` fires once per provider as it finishes or is abandoned.
    pub async fn compare_with_progress(
        &self,
        request: &ComparisonRequest,
        on_settled: &(dyn Fn() + Sync),
    ) -> Vec<Quote> {
        let calls = self.providers.iter().map(|provider| async move {
            let quotes = settle(provider.as_ref(), request).await;
            on_settled();
            quotes
        });

        let quotes: Vec<Quote> = join_all(calls).await.into_iter().flatten().collect();
        info!(
            providers = self.providers.len(),
            quotes = quotes.len(),
            "Comparison complete"
        );
        quotes
    }
}

/// Runs one provider within its own budget. Failures of any kind end here.
#[instrument(name = "ProviderCall", skip_all, fields(provider = %provider.name()))]
pub async fn settle(provider: &dyn QuoteProvider, request: &ComparisonRequest) -> Vec<Quote> {
    let budget = provider.timeout();
    let outcome = timeout(budget, provider.fetch_quotes(request))
        .await
        .unwrap_or(Err(QuoteError::Timeout(budget)));

    match outcome {
        Ok(quotes) => {
            let (valid, invalid): (Vec<Quote>, Vec<Quote>) =
                quotes.into_iter().partition(Quote::is_valid);
            if !invalid.is_empty() {
                debug!(dropped = invalid.len(), "Dropping invalid quotes");
            }
            debug!(count = valid.len(), "Provider responded");
            valid
        }
        Err(QuoteError::NoOffer(reason)) => {
            debug!(%reason, "Provider has no offer");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Provider failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::PayoutCategory;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behaviour {
        Quotes(Vec<Quote>),
        Fail,
        Hang,
    }

    struct FakeProvider {
        name: String,
        behaviour: Behaviour,
    }

    impl FakeProvider {
        fn arc(name: &str, behaviour: Behaviour) -> Arc<dyn QuoteProvider> {
            Arc::new(FakeProvider {
                name: name.to_string(),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        async fn fetch_quotes(
            &self,
            _request: &ComparisonRequest,
        ) -> Result<Vec<Quote>, QuoteError> {
            match &self.behaviour {
                Behaviour::Quotes(quotes) => Ok(quotes.clone()),
                Behaviour::Fail => Err(QuoteError::Status {
                    status: 503,
                    url: "http://provider.test".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn quote(provider: &str, rate: i64, recipient_gets: i64) -> Quote {
        Quote::new(
            provider,
            PayoutCategory::BankDeposit,
            Decimal::new(rate, 2),
            Decimal::ZERO,
            Decimal::new(recipient_gets, 0),
        )
    }

    #[tokio::test]
    async fn test_flattens_in_provider_order() {
        let aggregator = QuoteAggregator::new(vec![
            FakeProvider::arc("single", Behaviour::Quotes(vec![quote("A", 1000, 1000)])),
            FakeProvider::arc(
                "multi",
                Behaviour::Quotes(vec![quote("B1", 990, 990), quote("B2", 1010, 1010)]),
            ),
            FakeProvider::arc("empty", Behaviour::Quotes(Vec::new())),
        ]);

        let quotes = aggregator.compare(&ComparisonRequest::default()).await;
        let names: Vec<&str> = quotes.iter().map(|q| q.provider.as_str()).collect();
        assert_eq!(names, vec!["A", "B1", "B2"]);
    }

    #[tokio::test]
    async fn test_failing_provider_does_not_affect_others() {
        let healthy = vec![quote("A", 1000, 1000), quote("B", 1650, 1650)];
        let aggregator = QuoteAggregator::new(vec![
            FakeProvider::arc("a", Behaviour::Quotes(vec![healthy[0].clone()])),
            FakeProvider::arc("broken", Behaviour::Fail),
            FakeProvider::arc("b", Behaviour::Quotes(vec![healthy[1].clone()])),
        ]);

        let quotes = aggregator.compare(&ComparisonRequest::default()).await;
        assert_eq!(quotes, healthy);
    }

    #[tokio::test]
    async fn test_duplicate_provider_names_are_kept() {
        let aggregator = QuoteAggregator::new(vec![
            FakeProvider::arc("x", Behaviour::Quotes(vec![quote("Same", 1000, 1000)])),
            FakeProvider::arc("y", Behaviour::Quotes(vec![quote("Same", 1000, 1000)])),
        ]);

        let quotes = aggregator.compare(&ComparisonRequest::default()).await;
        assert_eq!(quotes.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_quotes_are_dropped() {
        let aggregator = QuoteAggregator::new(vec![FakeProvider::arc(
            "sloppy",
            Behaviour::Quotes(vec![quote("Zero", 0, 1000), quote("Good", 1000, 1000)]),
        )]);

        let quotes = aggregator.compare(&ComparisonRequest::default()).await;
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].provider, "Good");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_providers_are_abandoned_concurrently() {
        let aggregator = QuoteAggregator::new(vec![
            FakeProvider::arc("slow1", Behaviour::Hang),
            FakeProvider::arc("fast", Behaviour::Quotes(vec![quote("Fast", 1000, 1000)])),
            FakeProvider::arc("slow2", Behaviour::Hang),
        ]);

        let started = tokio::time::Instant::now();
        let quotes = aggregator.compare(&ComparisonRequest::default()).await;
        let elapsed = started.elapsed();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].provider, "Fast");
        // Bounded by one budget, not the sum of both hung ones
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_progress_fires_once_per_provider() {
        let aggregator = QuoteAggregator::new(vec![
            FakeProvider::arc("a", Behaviour::Quotes(vec![quote("A", 1000, 1000)])),
            FakeProvider::arc("broken", Behaviour::Fail),
        ]);
        let settled = AtomicUsize::new(0);

        aggregator
            .compare_with_progress(&ComparisonRequest::default(), &|| {
                settled.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(settled.load(Ordering::SeqCst), 2);
    }
}
