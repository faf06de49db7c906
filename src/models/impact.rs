// Almgren-Chriss market impact model
//
// Temporary-plus-permanent decomposition:
//   impact_fraction = eta * (q/d) + gamma * sigma * sqrt(q/d)
// with eta and gamma supplied via configuration. Zero quantity costs
// nothing; zero depth returns the configured cap instead of dividing.

use serde::Serialize;

use crate::config::ImpactConfig;
use crate::types::Side;

const DEPTH_EPSILON: f64 = 1e-12;

/// Impact decomposition for one order
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImpactBreakdown {
    /// Temporary (liquidity-consumption) component, percent of order value
    pub temporary_pct: f64,
    /// Permanent (information) component, percent of order value
    pub permanent_pct: f64,
    pub total_pct: f64,
    /// Cost in quote currency
    pub cost: f64,
    pub relative_size: f64,
    /// True when degenerate depth forced the configured cap
    pub capped: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactModelInfo {
    pub name: &'static str,
    pub eta: f64,
    pub gamma: f64,
    pub max_impact_pct: f64,
}

#[derive(Debug, Clone)]
pub struct AlmgrenChrissModel {
    config: ImpactConfig,
}

impl AlmgrenChrissModel {
    pub fn new(config: ImpactConfig) -> Self {
        Self { config }
    }

    /// Impact of executing `quantity` against `depth` of visible liquidity
    /// at the given volatility. `side` only affects which depth the caller
    /// passes in; the decomposition itself is symmetric.
    pub fn calculate_impact(
        &self,
        quantity: f64,
        _side: Side,
        volatility: f64,
        depth: f64,
        mid_price: f64,
    ) -> ImpactBreakdown {
        if quantity <= 0.0 {
            return ImpactBreakdown {
                temporary_pct: 0.0,
                permanent_pct: 0.0,
                total_pct: 0.0,
                cost: 0.0,
                relative_size: 0.0,
                capped: false,
            };
        }

        let order_value = quantity * mid_price;

        if depth <= DEPTH_EPSILON {
            return ImpactBreakdown {
                temporary_pct: self.config.max_impact_pct,
                permanent_pct: 0.0,
                total_pct: self.config.max_impact_pct,
                cost: order_value * self.config.max_impact_pct / 100.0,
                relative_size: f64::INFINITY,
                capped: true,
            };
        }

        let relative_size = quantity / depth;
        let temporary = self.config.eta * relative_size;
        let permanent = self.config.gamma * volatility.max(0.0) * relative_size.sqrt();

        let total_pct = ((temporary + permanent) * 100.0).min(self.config.max_impact_pct);
        let capped = (temporary + permanent) * 100.0 > self.config.max_impact_pct;

        // Preserve the component split under the cap
        let scale = if capped && temporary + permanent > 0.0 {
            total_pct / ((temporary + permanent) * 100.0)
        } else {
            1.0
        };

        ImpactBreakdown {
            temporary_pct: temporary * 100.0 * scale,
            permanent_pct: permanent * 100.0 * scale,
            total_pct,
            cost: order_value * total_pct / 100.0,
            relative_size,
            capped,
        }
    }

    pub fn model_info(&self) -> ImpactModelInfo {
        ImpactModelInfo {
            name: "almgren-chriss",
            eta: self.config.eta,
            gamma: self.config.gamma,
            max_impact_pct: self.config.max_impact_pct,
        }
    }
}
