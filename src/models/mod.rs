// Cost model components: slippage, market impact, fees, maker/taker
//
// Each model is a pure function of the current market snapshot plus trade
// parameters. The CostModel trait is the seam for swapping calibrations;
// selection is explicit configuration, never runtime type inspection.

pub mod fees;
pub mod impact;
pub mod maker_taker;
pub mod slippage;

pub use fees::FeeCalculator;
pub use impact::{AlmgrenChrissModel, ImpactBreakdown, ImpactModelInfo};
pub use maker_taker::MakerTakerEstimator;
pub use slippage::{SlippageEstimate, SlippageModel};

use crate::error::SimResult;
use crate::market::MarketSnapshot;
use crate::types::SimulationRequest;

/// One component of the total execution cost
#[derive(Debug, Clone)]
pub struct CostComponent {
    /// Cost in percent of order value
    pub pct: f64,
    /// Cost in quote currency
    pub cost: f64,
    /// (temporary_pct, permanent_pct) for models with a decomposition
    pub split: Option<(f64, f64)>,
    /// Set when the model returned a capped fallback for degenerate input
    pub warning: Option<String>,
}

/// Capability interface shared by interchangeable cost model variants
pub trait CostModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        request: &SimulationRequest,
        snapshot: &MarketSnapshot,
    ) -> SimResult<CostComponent>;
}

impl CostModel for SlippageModel {
    fn name(&self) -> &'static str {
        "slippage"
    }

    fn evaluate(
        &self,
        request: &SimulationRequest,
        snapshot: &MarketSnapshot,
    ) -> SimResult<CostComponent> {
        let estimate = self.predict_quantile(
            &snapshot.book,
            request.quantity,
            request.side,
            request.quantile,
        );
        let order_value = request.quantity * snapshot.metrics.mid_price;
        Ok(CostComponent {
            pct: estimate.pct,
            cost: order_value * estimate.pct / 100.0,
            split: None,
            warning: estimate
                .capped
                .then(|| "slippage capped: degenerate book depth".to_string()),
        })
    }
}

impl CostModel for AlmgrenChrissModel {
    fn name(&self) -> &'static str {
        "market_impact"
    }

    fn evaluate(
        &self,
        request: &SimulationRequest,
        snapshot: &MarketSnapshot,
    ) -> SimResult<CostComponent> {
        let breakdown = self.calculate_impact(
            request.quantity,
            request.side,
            snapshot.volatility_for(request),
            snapshot.depth_for(request),
            snapshot.metrics.mid_price,
        );
        Ok(CostComponent {
            pct: breakdown.total_pct,
            cost: breakdown.cost,
            split: Some((breakdown.temporary_pct, breakdown.permanent_pct)),
            warning: breakdown
                .capped
                .then(|| "market impact capped: degenerate depth".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImpactConfig, SlippageConfig};
    use crate::market::order_book::{OrderBook, PriceLevel};
    use crate::market::MarketDataHandle;
    use crate::types::Side;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot() -> MarketSnapshot {
        let handle = MarketDataHandle::new(Duration::from_secs(5));
        let book = Arc::new(
            OrderBook::new(
                "OKX".to_string(),
                "BTC-USDT".to_string(),
                Utc::now(),
                vec![
                    PriceLevel { price: 101.0, quantity: 1.0 },
                    PriceLevel { price: 102.0, quantity: 4.0 },
                ],
                vec![
                    PriceLevel { price: 100.0, quantity: 2.0 },
                    PriceLevel { price: 99.0, quantity: 3.0 },
                ],
            )
            .unwrap(),
        );
        let metrics = Arc::new(crate::market::MarketMetrics {
            timestamp: book.timestamp,
            symbol: book.symbol.clone(),
            mid_price: 100.5,
            spread: 1.0,
            bid_depth: 5.0,
            ask_depth: 5.0,
            volatility: 0.01,
        });
        handle.publish(book, metrics);
        handle.snapshot().unwrap()
    }

    #[test]
    fn test_models_share_the_evaluate_seam() {
        let models: Vec<Box<dyn CostModel>> = vec![
            Box::new(SlippageModel::new(SlippageConfig::default())),
            Box::new(AlmgrenChrissModel::new(ImpactConfig::default())),
        ];
        let snapshot = snapshot();
        let request = SimulationRequest::market("BTC-USDT", Side::Buy, 2.0, "VIP1");

        for model in &models {
            let component = model.evaluate(&request, &snapshot).unwrap();
            assert!(component.pct >= 0.0, "{} returned negative pct", model.name());
            assert!(component.cost >= 0.0);
            assert!(component.warning.is_none());
            if let Some((temporary, permanent)) = component.split {
                assert!((temporary + permanent - component.pct).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_evaluate_flags_degenerate_depth() {
        let model = AlmgrenChrissModel::new(ImpactConfig::default());
        let snapshot = snapshot();
        let mut request = SimulationRequest::market("BTC-USDT", Side::Buy, 2.0, "VIP1");
        request.depth_override = Some(0.0);

        let component = CostModel::evaluate(&model, &request, &snapshot).unwrap();
        assert!(component.warning.is_some());
        assert_eq!(component.pct, ImpactConfig::default().max_impact_pct);
    }
}
