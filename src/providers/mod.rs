pub mod mid_market;
pub mod remitly;
pub mod sendwave;
pub mod snapshot;
pub mod taptap;
pub mod util;
pub mod western_union;
pub mod wise;
pub mod worldremit;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::{PayoutCategory, Quote, QuoteProvider};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Keeps the highest-paying quote per payout category, bank deposit first.
/// Other-category quotes are dropped; ties keep the earliest quote.
pub(crate) fn best_per_category(quotes: Vec<Quote>) -> Vec<Quote> {
    [PayoutCategory::BankDeposit, PayoutCategory::CashPickup]
        .into_iter()
        .filter_map(|category| {
            quotes
                .iter()
                .filter(|quote| quote.category == category)
                .fold(None::<&Quote>, |best, quote| match best {
                    Some(b) if b.recipient_gets >= quote.recipient_gets => Some(b),
                    _ => Some(quote),
                })
                .cloned()
        })
        .collect()
}

/// Builds every enabled provider, in the fixed order results are merged.
pub fn build_providers(config: &AppConfig) -> Result<Vec<Arc<dyn QuoteProvider>>> {
    let providers = &config.providers;
    let scope = config.scope;
    let mut built: Vec<Arc<dyn QuoteProvider>> = Vec::new();

    if providers.remitly.enabled {
        built.push(Arc::new(
            remitly::RemitlyProvider::new(providers.remitly.clone())
                .context("Failed to create Remitly provider")?,
        ));
    }

    if providers.taptap.enabled {
        let reference: Option<Arc<dyn CurrencyRateProvider>> = if providers.mid_market.enabled {
            Some(Arc::new(
                mid_market::MidMarketRateProvider::new(
                    &providers.mid_market,
                    Arc::new(Cache::new()),
                )
                .context("Failed to create mid-market rate provider")?,
            ))
        } else {
            None
        };
        built.push(Arc::new(
            taptap::TapTapProvider::new(
                providers.taptap.clone(),
                config.snapshot_path(),
                reference,
            )
            .context("Failed to create TapTap Send provider")?,
        ));
    }

    if providers.wise.enabled {
        built.push(Arc::new(
            wise::WiseProvider::new(providers.wise.clone())
                .context("Failed to create Wise provider")?,
        ));
    }

    if providers.western_union.enabled {
        built.push(Arc::new(
            western_union::WesternUnionProvider::new(providers.western_union.clone(), scope)
                .context("Failed to create Western Union provider")?,
        ));
    }

    if providers.worldremit.enabled {
        built.push(Arc::new(
            worldremit::WorldRemitProvider::new(providers.worldremit.clone(), scope)
                .context("Failed to create WorldRemit provider")?,
        ));
    }

    if providers.sendwave.enabled {
        built.push(Arc::new(
            sendwave::SendwaveProvider::new(providers.sendwave.clone(), scope)
                .context("Failed to create Sendwave provider")?,
        ));
    }

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn quote(category: PayoutCategory, recipient_gets: i64) -> Quote {
        Quote::new(
            format!("P{recipient_gets}"),
            category,
            Decimal::TEN,
            Decimal::ZERO,
            Decimal::new(recipient_gets, 0),
        )
    }

    #[test]
    fn test_best_per_category() {
        let quotes = vec![
            quote(PayoutCategory::CashPickup, 990),
            quote(PayoutCategory::BankDeposit, 980),
            quote(PayoutCategory::CashPickup, 1001),
            quote(PayoutCategory::Other, 5000),
            quote(PayoutCategory::BankDeposit, 985),
        ];
        let best = best_per_category(quotes);
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].category, PayoutCategory::BankDeposit);
        assert_eq!(best[0].recipient_gets, Decimal::new(985, 0));
        assert_eq!(best[1].category, PayoutCategory::CashPickup);
        assert_eq!(best[1].recipient_gets, Decimal::new(1001, 0));
    }

    #[test]
    fn test_best_per_category_ties_keep_first() {
        let mut first = quote(PayoutCategory::BankDeposit, 900);
        first.provider = "first".to_string();
        let mut second = quote(PayoutCategory::BankDeposit, 900);
        second.provider = "second".to_string();

        let best = best_per_category(vec![first, second]);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].provider, "first");
    }

    #[tokio::test]
    async fn test_build_providers_order_and_toggles() {
        let mut config = AppConfig::default();
        let names: Vec<String> = build_providers(&config)
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "Remitly",
                "TapTap Send",
                "Wise",
                "Western Union",
                "WorldRemit",
                "Sendwave"
            ]
        );

        config.providers.wise.enabled = false;
        config.providers.sendwave.enabled = false;
        let names: Vec<String> = build_providers(&config)
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["Remitly", "TapTap Send", "Western Union", "WorldRemit"]
        );

        // TapTap Send still runs without its mid-market tier
        config.providers.mid_market.enabled = false;
        assert_eq!(build_providers(&config).unwrap().len(), 4);
    }
}
