// Rolling volatility estimation over mid-price history

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::config::VolatilityConfig;

/// Point-in-time volatility estimates. Values are per-sample fractions
/// (not annualized); 0.0 until at least two prices have been observed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolatilityEstimate {
    /// Sample standard deviation of log returns over the window
    pub realized: f64,
    /// Exponentially weighted estimate, sqrt of the EWMA variance
    pub ewma: f64,
    pub samples: usize,
}

impl VolatilityEstimate {
    /// Best single number for downstream models: EWMA when warmed up,
    /// realized otherwise.
    pub fn current(&self) -> f64 {
        if self.ewma > 0.0 {
            self.ewma
        } else {
            self.realized
        }
    }
}

/// Maintains a bounded rolling price window and derived estimates.
#[derive(Debug)]
pub struct VolatilityEstimator {
    window: VecDeque<(DateTime<Utc>, f64)>,
    capacity: usize,
    lambda: f64,
    ewma_variance: Option<f64>,
}

impl VolatilityEstimator {
    pub fn new(config: &VolatilityConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.window_size),
            capacity: config.window_size,
            lambda: config.ewma_lambda,
            ewma_variance: None,
        }
    }

    /// Append a price observation, evicting the oldest once at capacity.
    /// Non-positive prices are ignored (log returns would be undefined).
    pub fn add_price(&mut self, timestamp: DateTime<Utc>, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            return;
        }

        if let Some(&(_, previous)) = self.window.back() {
            let log_return = (price / previous).ln();
            let squared = log_return * log_return;
            self.ewma_variance = Some(match self.ewma_variance {
                // Seeded from the first observed return
                None => squared,
                Some(v) => self.lambda * v + (1.0 - self.lambda) * squared,
            });
        }

        self.window.push_back((timestamp, price));
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    pub fn estimate(&self) -> VolatilityEstimate {
        let samples = self.window.len();
        if samples < 2 {
            return VolatilityEstimate {
                realized: 0.0,
                ewma: 0.0,
                samples,
            };
        }

        let returns: Vec<f64> = self
            .window
            .iter()
            .zip(self.window.iter().skip(1))
            .map(|(&(_, p0), &(_, p1))| (p1 / p0).ln())
            .collect();

        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let realized = if returns.len() > 1 {
            let variance = returns
                .iter()
                .map(|r| (r - mean).powi(2))
                .sum::<f64>()
                / (returns.len() - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        VolatilityEstimate {
            realized,
            ewma: self.ewma_variance.map(f64::sqrt).unwrap_or(0.0),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
