use crate::core::quote::QuoteScope;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const SNAPSHOT_FILE: &str = "taptap_data.json";

fn enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SendwaveConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Receive country (alpha-2, lowercase) to pricing segment.
    pub segments: HashMap<String, String>,
    pub default_segment: String,
}

impl Default for SendwaveConfig {
    fn default() -> Self {
        let segments = [
            ("ph", "ph_gcash"),
            ("bd", "bd_bkash"),
            ("ma", "ma_cashplus"),
            ("sn", "sn_orange"),
        ]
        .into_iter()
        .map(|(country, segment)| (country.to_string(), segment.to_string()))
        .collect();

        SendwaveConfig {
            enabled: true,
            base_url: "https://app.sendwave.com".to_string(),
            timeout_secs: 10,
            segments,
            default_segment: "standard".to_string(),
        }
    }
}

impl SendwaveConfig {
    pub fn segment_for(&self, receive_country: &str) -> &str {
        self.segments
            .get(&receive_country.to_lowercase())
            .map_or(self.default_segment.as_str(), String::as_str)
    }
}

/// Settings shared by providers with nothing beyond an endpoint and a budget.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EndpointConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EndpointConfig {
    fn new(base_url: &str, timeout_secs: u64) -> Self {
        EndpointConfig {
            enabled: true,
            base_url: base_url.to_string(),
            timeout_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TapTapConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Budget for the whole rate resolution, all tiers included.
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Send country to receive country to fee, in send currency.
    pub fees: HashMap<String, HashMap<String, Decimal>>,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for TapTapConfig {
    fn default() -> Self {
        let table: &[(&str, &[(&str, i64)])] = &[
            ("US", &[("MA", 299), ("PH", 299), ("GT", 199)]),
            ("CA", &[("MA", 250), ("PH", 349)]),
            ("GB", &[("MA", 299), ("PH", 149)]),
            ("FR", &[("MA", 299), ("PH", 249)]),
            ("ES", &[("MA", 250), ("PH", 249)]),
            ("IT", &[("MA", 250), ("PH", 249)]),
            ("DE", &[("MA", 250), ("PH", 249)]),
        ];
        let fees = table
            .iter()
            .map(|(send, receivers)| {
                let by_receiver = receivers
                    .iter()
                    .map(|(receive, cents)| (receive.to_string(), Decimal::new(*cents, 2)))
                    .collect();
                (send.to_string(), by_receiver)
            })
            .collect();

        TapTapConfig {
            enabled: true,
            base_url: "https://api.taptapsend.com".to_string(),
            timeout_secs: 15,
            request_timeout_secs: 5,
            fees,
            snapshot_path: None,
        }
    }
}

impl TapTapConfig {
    /// Unknown corridors are assumed free.
    pub fn fee_for(&self, send_country: &str, receive_country: &str) -> Decimal {
        self.fees
            .get(&send_country.to_uppercase())
            .and_then(|by_receiver| by_receiver.get(&receive_country.to_uppercase()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WorldRemitConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Payout method codes, tried in order.
    pub methods: Vec<String>,
    pub bank_method: String,
}

impl Default for WorldRemitConfig {
    fn default() -> Self {
        WorldRemitConfig {
            enabled: true,
            base_url: "https://api.worldremit.com".to_string(),
            timeout_secs: 10,
            methods: vec!["CSH".to_string(), "BNK".to_string()],
            bank_method: "BNK".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProvidersConfig {
    pub sendwave: SendwaveConfig,
    pub western_union: EndpointConfig,
    pub remitly: EndpointConfig,
    pub taptap: TapTapConfig,
    pub wise: EndpointConfig,
    pub worldremit: WorldRemitConfig,
    pub mid_market: EndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            sendwave: SendwaveConfig::default(),
            western_union: EndpointConfig::new("https://www.westernunion.com", 15),
            remitly: EndpointConfig::new("https://api.remitly.io", 10),
            taptap: TapTapConfig::default(),
            wise: EndpointConfig::new("https://wise.com", 10),
            worldremit: WorldRemitConfig::default(),
            mid_market: EndpointConfig::new("https://open.er-api.com", 5),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub scope: QuoteScope,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "remitx", "remitx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "remitx", "remitx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Where the captured corridor-rate snapshot is looked up.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.providers.taptap.snapshot_path {
            return Some(path.clone());
        }
        self.default_data_path()
            .ok()
            .map(|dir| dir.join(SNAPSHOT_FILE))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
