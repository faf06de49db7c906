// Configuration management for the trade cost simulator

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub ws_url: String,
    pub symbol: String,
    /// Initial reconnect delay in seconds
    pub reconnect_base_secs: u64,
    /// Reconnect delay cap in seconds
    pub reconnect_cap_secs: u64,
    /// Application-level ping interval in seconds
    pub ping_interval_secs: u64,
    /// Snapshots older than this are reported stale
    pub stale_after_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook/okx/{symbol}".to_string(),
            symbol: "BTC-USDT-SWAP".to_string(),
            reconnect_base_secs: 1,
            reconnect_cap_secs: 30,
            ping_interval_secs: 10,
            stale_after_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityConfig {
    /// Rolling price window capacity
    pub window_size: usize,
    /// EWMA decay factor
    pub ewma_lambda: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            window_size: 120,
            ewma_lambda: 0.94,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactConfig {
    /// Temporary impact coefficient (eta)
    pub eta: f64,
    /// Permanent impact coefficient (gamma)
    pub gamma: f64,
    /// Cap applied when depth is degenerate, in percent of order value
    pub max_impact_pct: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            eta: 0.1,
            gamma: 0.02,
            max_impact_pct: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlippageConfig {
    /// Number of calibration observations retained
    pub history_size: usize,
    /// Fallback cap when the book is degenerate, in percent of order value
    pub max_slippage_pct: f64,
    /// Premium charged on quantity beyond visible liquidity (fraction)
    pub unfilled_premium: f64,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            history_size: 100,
            max_slippage_pct: 5.0,
            unfilled_premium: 0.005,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerTakerConfig {
    /// Base maker proportion for a fully passive limit order
    pub base_maker_proportion: f64,
    /// How strongly quantity/depth converts fills to taker
    pub size_sensitivity: f64,
    /// How strongly limit price aggressiveness converts fills to taker.
    /// At 0 aggressiveness is ignored; at 1 a fully crossing limit is
    /// all taker.
    pub aggressiveness_sensitivity: f64,
}

impl Default for MakerTakerConfig {
    fn default() -> Self {
        Self {
            base_maker_proportion: 0.7,
            size_sensitivity: 0.5,
            aggressiveness_sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeRates {
    pub maker: f64,
    pub taker: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Result cache capacity (LRU eviction)
    pub cache_capacity: usize,
    /// Quantity bucket width used in cache fingerprints
    pub quantity_bucket: f64,
    /// Volatility bucket width used in cache fingerprints
    pub volatility_bucket: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 256,
            quantity_bucket: 0.01,
            volatility_bucket: 0.001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub volatility: VolatilityConfig,
    pub impact: ImpactConfig,
    pub slippage: SlippageConfig,
    pub maker_taker: MakerTakerConfig,
    pub simulator: SimulatorConfig,
    /// Fee tier table: tier id -> maker/taker rates
    pub fee_tiers: BTreeMap<String, FeeRates>,
}

/// OKX spot tier schedule; override per deployment in config.toml
fn default_fee_tiers() -> BTreeMap<String, FeeRates> {
    let mut tiers = BTreeMap::new();
    tiers.insert("VIP1".to_string(), FeeRates { maker: 0.00080, taker: 0.00100 });
    tiers.insert("VIP2".to_string(), FeeRates { maker: 0.00065, taker: 0.00085 });
    tiers.insert("VIP3".to_string(), FeeRates { maker: 0.00050, taker: 0.00075 });
    tiers.insert("VIP4".to_string(), FeeRates { maker: 0.00035, taker: 0.00060 });
    tiers.insert("VIP5".to_string(), FeeRates { maker: 0.00025, taker: 0.00045 });
    tiers
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            volatility: VolatilityConfig::default(),
            impact: ImpactConfig::default(),
            slippage: SlippageConfig::default(),
            maker_taker: MakerTakerConfig::default(),
            simulator: SimulatorConfig::default(),
            fee_tiers: default_fee_tiers(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            tracing::info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.reconnect_base_secs == 0 {
            return Err(ConfigError::Validation(
                "feed.reconnect_base_secs must be greater than 0".to_string(),
            ));
        }
        if self.feed.reconnect_cap_secs < self.feed.reconnect_base_secs {
            return Err(ConfigError::Validation(
                "feed.reconnect_cap_secs must be >= reconnect_base_secs".to_string(),
            ));
        }
        if self.volatility.window_size < 2 {
            return Err(ConfigError::Validation(
                "volatility.window_size must be at least 2".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.volatility.ewma_lambda) {
            return Err(ConfigError::Validation(
                "volatility.ewma_lambda must be within [0, 1)".to_string(),
            ));
        }
        if self.impact.eta < 0.0 || self.impact.gamma < 0.0 {
            return Err(ConfigError::Validation(
                "impact coefficients must be non-negative".to_string(),
            ));
        }
        if self.impact.max_impact_pct <= 0.0 {
            return Err(ConfigError::Validation(
                "impact.max_impact_pct must be positive".to_string(),
            ));
        }
        if self.slippage.max_slippage_pct <= 0.0 {
            return Err(ConfigError::Validation(
                "slippage.max_slippage_pct must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.maker_taker.base_maker_proportion) {
            return Err(ConfigError::Validation(
                "maker_taker.base_maker_proportion must be within [0, 1]".to_string(),
            ));
        }
        if self.maker_taker.size_sensitivity < 0.0
            || self.maker_taker.aggressiveness_sensitivity < 0.0
        {
            return Err(ConfigError::Validation(
                "maker_taker sensitivities must be non-negative".to_string(),
            ));
        }
        if self.simulator.cache_capacity == 0 {
            return Err(ConfigError::Validation(
                "simulator.cache_capacity must be greater than 0".to_string(),
            ));
        }
        if self.simulator.quantity_bucket <= 0.0 || self.simulator.volatility_bucket <= 0.0 {
            return Err(ConfigError::Validation(
                "simulator fingerprint buckets must be positive".to_string(),
            ));
        }
        if self.fee_tiers.is_empty() {
            return Err(ConfigError::Validation(
                "fee_tiers table must not be empty".to_string(),
            ));
        }
        for (tier, rates) in &self.fee_tiers {
            if rates.maker < 0.0 || rates.taker < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "fee tier {} has negative rates",
                    tier
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for crate::error::SimulatorError {
    fn from(err: ConfigError) -> Self {
        crate::error::SimulatorError::Config(err.to_string())
    }
}
