// Maker/taker fill proportion estimation

use crate::config::MakerTakerConfig;
use crate::types::{OrderType, Side};

const DEPTH_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct MakerTakerEstimator {
    config: MakerTakerConfig,
}

impl MakerTakerEstimator {
    pub fn new(config: MakerTakerConfig) -> Self {
        Self { config }
    }

    /// Fraction of the order expected to fill as maker, always in [0, 1].
    ///
    /// Market orders remove liquidity entirely (0). Limit orders start from
    /// the configured base proportion, scale up with passivity (distance
    /// from the touch) and down as quantity/depth grows, since larger
    /// relative size crosses more levels and converts fills to taker.
    pub fn estimate(
        &self,
        order_type: OrderType,
        _side: Side,
        quantity: f64,
        depth: f64,
        aggressiveness: f64,
    ) -> f64 {
        if order_type == OrderType::Market {
            return 0.0;
        }

        let passivity = (1.0
            - self.config.aggressiveness_sensitivity * aggressiveness.clamp(0.0, 1.0))
        .clamp(0.0, 1.0);
        let relative_size = if depth > DEPTH_EPSILON {
            (quantity.max(0.0) / depth).min(1.0)
        } else {
            // No visible depth: assume the order dominates the book
            1.0
        };

        let maker = self.config.base_maker_proportion
            * passivity
            * (1.0 - self.config.size_sensitivity * relative_size);

        maker.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> MakerTakerEstimator {
        MakerTakerEstimator::new(MakerTakerConfig::default())
    }

    #[test]
    fn test_market_orders_all_taker() {
        let est = estimator();
        assert_eq!(est.estimate(OrderType::Market, Side::Buy, 1.0, 100.0, 0.0), 0.0);
        assert_eq!(est.estimate(OrderType::Market, Side::Sell, 50.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_passive_limit_near_base() {
        let est = estimator();
        let maker = est.estimate(OrderType::Limit, Side::Buy, 0.001, 100.0, 0.0);
        assert!((maker - 0.7).abs() < 0.01);
    }

    #[test]
    fn test_increases_with_passivity() {
        let est = estimator();
        let aggressive = est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 0.9);
        let passive = est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 0.1);
        assert!(passive > aggressive);
    }

    #[test]
    fn test_decreases_with_relative_size() {
        let est = estimator();
        let small = est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 0.2);
        let large = est.estimate(OrderType::Limit, Side::Buy, 80.0, 100.0, 0.2);
        assert!(large < small);
    }

    #[test]
    fn test_always_in_unit_interval() {
        let est = estimator();
        for &quantity in &[0.0, 1.0, 1e9] {
            for &depth in &[0.0, 1.0, 1e6] {
                for &aggressiveness in &[-1.0, 0.0, 0.5, 1.0, 2.0] {
                    let maker = est.estimate(
                        OrderType::Limit,
                        Side::Sell,
                        quantity,
                        depth,
                        aggressiveness,
                    );
                    assert!((0.0..=1.0).contains(&maker));
                }
            }
        }
    }

    #[test]
    fn test_fully_crossing_limit_is_taker() {
        let est = estimator();
        assert_eq!(est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 1.0), 0.0);
    }

    #[test]
    fn test_aggressiveness_sensitivity_scales_the_penalty() {
        let mut config = MakerTakerConfig::default();
        config.aggressiveness_sensitivity = 0.0;
        let est = MakerTakerEstimator::new(config);

        // With the penalty disabled, aggressiveness no longer matters
        let passive = est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 0.0);
        let crossing = est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 1.0);
        assert_eq!(passive, crossing);
        assert!(crossing > 0.0);

        let mut config = MakerTakerConfig::default();
        config.aggressiveness_sensitivity = 2.0;
        let est = MakerTakerEstimator::new(config);

        // A stronger penalty hits taker territory at half aggressiveness
        assert_eq!(est.estimate(OrderType::Limit, Side::Buy, 1.0, 100.0, 0.5), 0.0);
    }
}
