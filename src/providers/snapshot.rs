//! Corridor-rate listings, as served by TapTap Send and as captured on disk.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorridorRates {
    #[serde(default)]
    pub available_countries: Vec<SourceCountry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCountry {
    pub iso_country_code: String,
    #[serde(default)]
    pub corridors: Vec<Corridor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corridor {
    pub iso_country_code: String,
    pub currency: String,
    pub fx_rate: Option<Decimal>,
}

impl CorridorRates {
    /// Rate for the corridor leaving `send_country` towards
    /// `receive_country` paid out in `receive_currency`.
    ///
    /// Only positive rates count as found.
    pub fn find_rate(
        &self,
        send_country: &str,
        receive_country: &str,
        receive_currency: &str,
    ) -> Option<Decimal> {
        self.available_countries
            .iter()
            .find(|source| source.iso_country_code.eq_ignore_ascii_case(send_country))?
            .corridors
            .iter()
            .find(|corridor| {
                corridor.iso_country_code.eq_ignore_ascii_case(receive_country)
                    && corridor.currency.eq_ignore_ascii_case(receive_currency)
            })?
            .fx_rate
            .filter(|rate| *rate > Decimal::ZERO)
    }
}

fn read_snapshot(path: &Path) -> Result<CorridorRates> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// Loads the locally captured listing.
///
/// A missing file is the normal case and yields `None` quietly; a broken one
/// is logged and also yields `None`.
pub fn load_snapshot(path: &Path) -> Option<CorridorRates> {
    if !path.exists() {
        debug!("No corridor snapshot at {}", path.display());
        return None;
    }

    match read_snapshot(path) {
        Ok(rates) => Some(rates),
        Err(e) => {
            warn!(error = %e, "Ignoring unusable corridor snapshot");
            None
        }
    }
}
