// Request and result types shared across the simulator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{SimResult, SimulatorError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Parameters for a single trade simulation. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub exchange: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    /// Order quantity in base currency
    pub quantity: f64,
    pub fee_tier: String,
    /// Limit-order passivity in [0,1]; 1.0 = crossing the spread immediately
    pub aggressiveness: f64,
    /// Slippage quantile for conservative estimates (0.5 = median)
    pub quantile: f64,
    /// Optional volatility override (fraction, e.g. 0.02 = 2%)
    pub volatility_override: Option<f64>,
    /// Optional depth override in base currency
    pub depth_override: Option<f64>,
}

impl SimulationRequest {
    pub fn market(symbol: &str, side: Side, quantity: f64, fee_tier: &str) -> Self {
        Self {
            exchange: "OKX".to_string(),
            symbol: symbol.to_string(),
            order_type: OrderType::Market,
            side,
            quantity,
            fee_tier: fee_tier.to_string(),
            aggressiveness: 1.0,
            quantile: 0.9,
            volatility_override: None,
            depth_override: None,
        }
    }

    pub fn limit(symbol: &str, side: Side, quantity: f64, fee_tier: &str, aggressiveness: f64) -> Self {
        Self {
            order_type: OrderType::Limit,
            aggressiveness,
            ..Self::market(symbol, side, quantity, fee_tier)
        }
    }

    /// Caller-facing validation; failures here are synchronous and the
    /// simulation is not attempted.
    pub fn validate(&self) -> SimResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(SimulatorError::Validation(
                "symbol".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(SimulatorError::Validation(
                "quantity".to_string(),
                format!("must be a positive number, got {}", self.quantity),
            ));
        }
        if !(0.0..=1.0).contains(&self.aggressiveness) {
            return Err(SimulatorError::Validation(
                "aggressiveness".to_string(),
                format!("must be within [0, 1], got {}", self.aggressiveness),
            ));
        }
        if !(0.0..1.0).contains(&self.quantile) {
            return Err(SimulatorError::Validation(
                "quantile".to_string(),
                format!("must be within [0, 1), got {}", self.quantile),
            ));
        }
        if let Some(vol) = self.volatility_override {
            if !vol.is_finite() || vol < 0.0 {
                return Err(SimulatorError::Validation(
                    "volatility_override".to_string(),
                    "must be non-negative".to_string(),
                ));
            }
        }
        if let Some(depth) = self.depth_override {
            if !depth.is_finite() || depth < 0.0 {
                return Err(SimulatorError::Validation(
                    "depth_override".to_string(),
                    "must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Per-stage wall-clock timings recorded during a simulation, in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageLatencies {
    pub slippage_ms: f64,
    pub impact_ms: f64,
    pub maker_taker_ms: f64,
    pub fees_ms: f64,
    pub total_ms: f64,
}

/// Fee component of a simulation result
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeeBreakdown {
    pub maker_rate: f64,
    pub taker_rate: f64,
    pub maker_fee: f64,
    pub taker_fee: f64,
    pub total: f64,
    pub effective_rate: f64,
}

/// Outcome of a single trade simulation. Produced once, immutable, shared
/// across threads behind an Arc. Fields are additive-only for consumers.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub timestamp: DateTime<Utc>,
    pub exchange: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub quantity: f64,
    pub fee_tier: String,

    pub mid_price: f64,
    pub spread: f64,
    pub volatility: f64,
    pub order_value: f64,

    /// Expected slippage in percent of order value
    pub expected_slippage_pct: f64,
    pub slippage_cost: f64,
    pub temporary_impact_pct: f64,
    pub permanent_impact_pct: f64,
    pub market_impact_cost: f64,
    pub maker_fraction: f64,
    pub taker_fraction: f64,
    pub fees: FeeBreakdown,
    pub fee_cost: f64,

    pub total_cost: f64,
    pub total_cost_bps: f64,

    pub latency: StageLatencies,
    /// Degraded-input annotations; present when a model fell back to a cap
    pub warnings: Vec<String>,
}

/// One labelled parameter variation within a batch sweep
#[derive(Debug, Clone)]
pub struct Variation {
    pub label: String,
    pub quantity: Option<f64>,
    pub fee_tier: Option<String>,
    pub order_type: Option<OrderType>,
    pub aggressiveness: Option<f64>,
    pub volatility_override: Option<f64>,
}

impl Variation {
    pub fn quantity(label: &str, quantity: f64) -> Self {
        Self {
            label: label.to_string(),
            quantity: Some(quantity),
            fee_tier: None,
            order_type: None,
            aggressiveness: None,
            volatility_override: None,
        }
    }

    /// Apply this variation on top of a base request
    pub fn apply(&self, base: &SimulationRequest) -> SimulationRequest {
        let mut request = base.clone();
        if let Some(quantity) = self.quantity {
            request.quantity = quantity;
        }
        if let Some(ref tier) = self.fee_tier {
            request.fee_tier = tier.clone();
        }
        if let Some(order_type) = self.order_type {
            request.order_type = order_type;
        }
        if let Some(aggressiveness) = self.aggressiveness {
            request.aggressiveness = aggressiveness;
        }
        if let Some(vol) = self.volatility_override {
            request.volatility_override = Some(vol);
        }
        request
    }
}

/// Results of a batch sweep, in declared variation order
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub started_at: DateTime<Utc>,
    pub results: Vec<(String, Arc<SimulationResult>)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let request = SimulationRequest::market("BTC-USDT", Side::Buy, 1.0, "VIP1");
        assert!(request.validate().is_ok());

        let mut bad = request.clone();
        bad.quantity = -1.0;
        assert!(matches!(bad.validate(), Err(SimulatorError::Validation(_, _))));

        let mut bad = request.clone();
        bad.symbol = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = request;
        bad.quantile = 1.0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_variation_apply() {
        let base = SimulationRequest::market("BTC-USDT", Side::Buy, 1.0, "VIP1");
        let varied = Variation::quantity("qty=5", 5.0).apply(&base);
        assert_eq!(varied.quantity, 5.0);
        assert_eq!(varied.symbol, base.symbol);
        assert_eq!(varied.fee_tier, base.fee_tier);
    }
}
