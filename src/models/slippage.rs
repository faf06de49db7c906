// Slippage prediction from order book liquidity
//
// Combines a book-walk theoretical impact with a linear fit recalibrated
// against recent observations. Quantile predictions add a residual spread
// term for conservative estimates.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::SlippageConfig;
use crate::market::order_book::OrderBook;
use crate::types::Side;

// Standard normal quantiles used to approximate quantile regression
const Z_TABLE: [(f64, f64); 5] = [
    (0.50, 0.0),
    (0.75, 0.674),
    (0.90, 1.282),
    (0.95, 1.645),
    (0.99, 2.326),
];

// Relative sizes probed on each recalibration
const PROBE_FRACTIONS: [f64; 3] = [0.001, 0.01, 0.05];

const MIN_OBSERVATIONS: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
struct LinearFit {
    slope: f64,
    intercept: f64,
    residual_std: f64,
    observations: usize,
}

#[derive(Debug, Default)]
struct CalibrationState {
    /// (relative order size, theoretical impact pct) observations
    history: VecDeque<(f64, f64)>,
    fit: LinearFit,
}

/// Predicted slippage for one order, in percent of order value
#[derive(Debug, Clone, Copy)]
pub struct SlippageEstimate {
    pub pct: f64,
    /// True when the book was too degenerate to model and the configured
    /// cap was returned instead
    pub capped: bool,
}

pub struct SlippageModel {
    config: SlippageConfig,
    state: Mutex<CalibrationState>,
}

impl SlippageModel {
    pub fn new(config: SlippageConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CalibrationState::default()),
        }
    }

    /// Theoretical price impact of sweeping the book: VWAP of the walk
    /// versus the best price, with a worst-case premium on any quantity
    /// beyond visible liquidity. Returns percent of order value.
    fn theoretical_impact(&self, book: &OrderBook, quantity: f64, side: Side) -> Option<f64> {
        if quantity <= 0.0 {
            return Some(0.0);
        }

        let base_price = match side {
            Side::Buy => book.best_ask().ok()?,
            Side::Sell => book.best_bid().ok()?,
        };

        let (vwap, filled) = book.vwap(quantity, side).ok()?;
        let mut total_value = vwap * filled;

        let unfilled = quantity - filled;
        if unfilled > 0.0 {
            let worst = book.worst_price(side)?;
            let extrapolated = match side {
                Side::Buy => worst * (1.0 + self.config.unfilled_premium),
                Side::Sell => worst * (1.0 - self.config.unfilled_premium),
            };
            total_value += unfilled * extrapolated;
        }

        let avg_price = total_value / quantity;
        let impact = match side {
            Side::Buy => (avg_price / base_price - 1.0) * 100.0,
            Side::Sell => (1.0 - avg_price / base_price) * 100.0,
        };
        Some(impact.max(0.0))
    }

    /// Recalibrate against the freshest book: probe a few relative sizes,
    /// append observations, refit the linear relationship.
    pub fn update(&self, book: &OrderBook) {
        let mut observations = Vec::new();
        for side in [Side::Buy, Side::Sell] {
            let depth = book.executable_depth(side);
            if depth <= 0.0 {
                continue;
            }
            for fraction in PROBE_FRACTIONS {
                let quantity = depth * fraction;
                if let Some(impact) = self.theoretical_impact(book, quantity, side) {
                    observations.push((fraction, impact));
                }
            }
        }

        if observations.is_empty() {
            return;
        }

        let mut state = self.state.lock().expect("slippage state lock poisoned");
        for obs in observations {
            state.history.push_back(obs);
        }
        while state.history.len() > self.config.history_size {
            state.history.pop_front();
        }
        state.fit = Self::fit(&state.history);
    }

    /// Ordinary least squares of impact pct on relative size
    fn fit(history: &VecDeque<(f64, f64)>) -> LinearFit {
        let n = history.len();
        if n < 2 {
            return LinearFit::default();
        }

        let nf = n as f64;
        let mean_x = history.iter().map(|(x, _)| x).sum::<f64>() / nf;
        let mean_y = history.iter().map(|(_, y)| y).sum::<f64>() / nf;

        let mut ss_xx = 0.0;
        let mut ss_xy = 0.0;
        for &(x, y) in history {
            ss_xx += (x - mean_x) * (x - mean_x);
            ss_xy += (x - mean_x) * (y - mean_y);
        }

        let slope = if ss_xx > 0.0 { ss_xy / ss_xx } else { 0.0 };
        let intercept = mean_y - slope * mean_x;

        let residual_variance = history
            .iter()
            .map(|&(x, y)| {
                let predicted = intercept + slope * x;
                (y - predicted) * (y - predicted)
            })
            .sum::<f64>()
            / nf;

        LinearFit {
            slope,
            intercept,
            residual_std: residual_variance.sqrt(),
            observations: n,
        }
    }

    /// Expected slippage from the fitted linear relationship, in percent.
    /// Zero-depth books yield the configured cap instead of failing.
    pub fn predict_linear(&self, book: &OrderBook, quantity: f64, side: Side) -> SlippageEstimate {
        let depth = book.executable_depth(side);
        if depth <= 0.0 {
            return SlippageEstimate {
                pct: self.config.max_slippage_pct,
                capped: true,
            };
        }

        let theoretical = match self.theoretical_impact(book, quantity, side) {
            Some(pct) => pct,
            None => {
                return SlippageEstimate {
                    pct: self.config.max_slippage_pct,
                    capped: true,
                }
            }
        };

        let fit = self.state.lock().expect("slippage state lock poisoned").fit;
        let pct = if fit.observations < MIN_OBSERVATIONS {
            theoretical
        } else {
            let relative_size = quantity / depth;
            let fitted = (fit.intercept + fit.slope * relative_size).max(0.0);
            0.7 * fitted + 0.3 * theoretical
        };

        SlippageEstimate {
            pct: pct.clamp(0.0, self.config.max_slippage_pct),
            capped: pct > self.config.max_slippage_pct,
        }
    }

    /// Distributional estimate at the given quantile: the linear prediction
    /// plus z(quantile) residual standard deviations.
    pub fn predict_quantile(
        &self,
        book: &OrderBook,
        quantity: f64,
        side: Side,
        quantile: f64,
    ) -> SlippageEstimate {
        let base = self.predict_linear(book, quantity, side);
        if base.capped {
            return base;
        }

        let fit = self.state.lock().expect("slippage state lock poisoned").fit;
        let pct = if fit.observations < MIN_OBSERVATIONS {
            // Not enough residual history; scale with a safety factor
            if quantile > 0.5 {
                base.pct * (1.0 + (quantile - 0.5) * 2.0)
            } else {
                base.pct
            }
        } else {
            base.pct + z_score(quantile) * fit.residual_std
        };

        SlippageEstimate {
            pct: pct.clamp(0.0, self.config.max_slippage_pct),
            capped: pct > self.config.max_slippage_pct,
        }
    }
}

/// Standard normal quantile, linearly interpolated over the table.
/// Quantiles below the median map to 0.
fn z_score(quantile: f64) -> f64 {
    if quantile <= Z_TABLE[0].0 {
        return 0.0;
    }
    for window in Z_TABLE.windows(2) {
        let (q0, z0) = window[0];
        let (q1, z1) = window[1];
        if quantile <= q1 {
            return z0 + (z1 - z0) * (quantile - q0) / (q1 - q0);
        }
    }
    Z_TABLE[Z_TABLE.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::order_book::PriceLevel;
    use chrono::Utc;

    fn model() -> SlippageModel {
        SlippageModel::new(SlippageConfig::default())
    }

    fn book() -> OrderBook {
        OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![
                PriceLevel { price: 101.0, quantity: 1.0 },
                PriceLevel { price: 102.0, quantity: 4.0 },
                PriceLevel { price: 103.0, quantity: 10.0 },
            ],
            vec![
                PriceLevel { price: 100.0, quantity: 2.0 },
                PriceLevel { price: 99.0, quantity: 3.0 },
                PriceLevel { price: 98.0, quantity: 10.0 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_zero_quantity_zero_impact() {
        let m = model();
        assert_eq!(m.theoretical_impact(&book(), 0.0, Side::Buy), Some(0.0));
    }

    #[test]
    fn test_small_order_fills_at_best() {
        let m = model();
        // 0.5 fits inside the best ask level, no impact
        let impact = m.theoretical_impact(&book(), 0.5, Side::Buy).unwrap();
        assert!(impact.abs() < 1e-9);
    }

    #[test]
    fn test_larger_orders_cost_more() {
        let m = model();
        let small = m.theoretical_impact(&book(), 1.0, Side::Buy).unwrap();
        let large = m.theoretical_impact(&book(), 10.0, Side::Buy).unwrap();
        assert!(large > small);
    }

    #[test]
    fn test_beyond_book_charged_premium() {
        let m = model();
        let inside = m.theoretical_impact(&book(), 15.0, Side::Buy).unwrap();
        let beyond = m.theoretical_impact(&book(), 30.0, Side::Buy).unwrap();
        assert!(beyond > inside);
    }

    #[test]
    fn test_empty_book_capped_fallback() {
        let m = model();
        let empty = OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![],
            vec![PriceLevel { price: 100.0, quantity: 1.0 }],
        )
        .unwrap();
        let estimate = m.predict_linear(&empty, 1.0, Side::Buy);
        assert!(estimate.capped);
        assert_eq!(estimate.pct, m.config.max_slippage_pct);
    }

    #[test]
    fn test_quantile_at_least_linear() {
        let m = model();
        let b = book();
        for _ in 0..5 {
            m.update(&b);
        }
        let linear = m.predict_linear(&b, 5.0, Side::Buy);
        let q95 = m.predict_quantile(&b, 5.0, Side::Buy, 0.95);
        assert!(q95.pct >= linear.pct);
    }

    #[test]
    fn test_calibration_bounded() {
        let m = model();
        let b = book();
        for _ in 0..100 {
            m.update(&b);
        }
        let state = m.state.lock().unwrap();
        assert!(state.history.len() <= m.config.history_size);
        assert!(state.fit.observations >= MIN_OBSERVATIONS);
    }

    #[test]
    fn test_z_score_interpolation() {
        assert_eq!(z_score(0.5), 0.0);
        assert!((z_score(0.95) - 1.645).abs() < 1e-9);
        let mid = z_score(0.925);
        assert!(mid > 1.282 && mid < 1.645);
        assert_eq!(z_score(0.999), 2.326);
    }
}
