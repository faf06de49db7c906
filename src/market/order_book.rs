// L2 order book model
// Replaced wholesale on each valid inbound snapshot; no diff merging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulatorError};
use crate::types::Side;

/// A single aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Full L2 order book snapshot for one symbol.
/// Asks strictly ascending by price, bids strictly descending.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBook {
    pub exchange: String,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Monotone snapshot counter, assigned by the ingestion path
    pub sequence: u64,
    pub asks: Vec<PriceLevel>,
    pub bids: Vec<PriceLevel>,
}

impl OrderBook {
    /// Build a validated book from unordered levels. Sorts both sides,
    /// rejects negative quantities and crossed books.
    pub fn new(
        exchange: String,
        symbol: String,
        timestamp: DateTime<Utc>,
        mut asks: Vec<PriceLevel>,
        mut bids: Vec<PriceLevel>,
    ) -> SimResult<Self> {
        for level in asks.iter().chain(bids.iter()) {
            if !level.price.is_finite() || level.price < 0.0 {
                return Err(SimulatorError::Parse(format!(
                    "invalid price {}",
                    level.price
                )));
            }
            if !level.quantity.is_finite() || level.quantity < 0.0 {
                return Err(SimulatorError::Parse(format!(
                    "invalid quantity {} at price {}",
                    level.quantity, level.price
                )));
            }
        }

        // Zero-quantity levels carry no liquidity; drop them up front
        asks.retain(|l| l.quantity > 0.0);
        bids.retain(|l| l.quantity > 0.0);

        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));

        let book = Self {
            exchange,
            symbol,
            timestamp,
            sequence: 0,
            asks,
            bids,
        };

        if let (Ok(bid), Ok(ask)) = (book.best_bid(), book.best_ask()) {
            if bid >= ask {
                return Err(SimulatorError::CrossedBook { bid, ask });
            }
        }

        Ok(book)
    }

    /// Lowest ask price
    pub fn best_ask(&self) -> SimResult<f64> {
        self.asks
            .first()
            .map(|l| l.price)
            .ok_or(SimulatorError::EmptyBook("ask"))
    }

    /// Highest bid price
    pub fn best_bid(&self) -> SimResult<f64> {
        self.bids
            .first()
            .map(|l| l.price)
            .ok_or(SimulatorError::EmptyBook("bid"))
    }

    pub fn mid_price(&self) -> SimResult<f64> {
        Ok((self.best_bid()? + self.best_ask()?) / 2.0)
    }

    pub fn spread(&self) -> SimResult<f64> {
        Ok(self.best_ask()? - self.best_bid()?)
    }

    /// Total quantity on the bid side across all retained levels
    pub fn bid_depth(&self) -> f64 {
        self.bids.iter().map(|l| l.quantity).sum()
    }

    /// Total quantity on the ask side across all retained levels
    pub fn ask_depth(&self) -> f64 {
        self.asks.iter().map(|l| l.quantity).sum()
    }

    /// Depth relevant to executing on the given side: asks for a buy,
    /// bids for a sell.
    pub fn executable_depth(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.ask_depth(),
            Side::Sell => self.bid_depth(),
        }
    }

    /// Cumulative quantity within `offset` of the best price on a side.
    /// Levels are sorted, so the walk stops at the first level outside
    /// the boundary.
    pub fn depth_at_price(&self, offset: f64, side: Side) -> SimResult<f64> {
        let mut depth = 0.0;
        match side {
            Side::Buy => {
                let boundary = self.best_ask()? + offset;
                for level in &self.asks {
                    if level.price > boundary {
                        break;
                    }
                    depth += level.quantity;
                }
            }
            Side::Sell => {
                let boundary = self.best_bid()? - offset;
                for level in &self.bids {
                    if level.price < boundary {
                        break;
                    }
                    depth += level.quantity;
                }
            }
        }
        Ok(depth)
    }

    /// Volume-weighted average execution price for `quantity`, walking the
    /// book from the best level. Returns (vwap, filled_quantity); the fill
    /// may be partial when visible liquidity runs out.
    pub fn vwap(&self, quantity: f64, side: Side) -> SimResult<(f64, f64)> {
        let levels = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };
        if levels.is_empty() {
            return Err(SimulatorError::EmptyBook(match side {
                Side::Buy => "ask",
                Side::Sell => "bid",
            }));
        }

        let mut remaining = quantity;
        let mut total_value = 0.0;
        let mut filled = 0.0;

        for level in levels {
            if remaining <= 0.0 {
                break;
            }
            let take = remaining.min(level.quantity);
            total_value += take * level.price;
            filled += take;
            remaining -= take;
        }

        if filled > 0.0 {
            Ok((total_value / filled, filled))
        } else {
            Err(SimulatorError::DegenerateInput(
                "no visible liquidity for vwap".to_string(),
            ))
        }
    }

    /// Price of the worst (deepest) level on a side, used to extrapolate
    /// beyond visible liquidity.
    pub fn worst_price(&self, side: Side) -> Option<f64> {
        match side {
            Side::Buy => self.asks.last().map(|l| l.price),
            Side::Sell => self.bids.last().map(|l| l.price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_book() -> OrderBook {
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
        .unwrap()
    }

    #[test]
    fn test_best_prices_and_derived() {
        let book = sample_book();
        assert_eq!(book.best_bid().unwrap(), 100.0);
        assert_eq!(book.best_ask().unwrap(), 101.0);
        assert_eq!(book.mid_price().unwrap(), 100.5);
        assert_eq!(book.spread().unwrap(), 1.0);
        assert_eq!(book.bid_depth(), 5.0);
        assert_eq!(book.ask_depth(), 5.0);
    }

    #[test]
    fn test_crossed_book_rejected() {
        let result = OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![PriceLevel { price: 99.0, quantity: 1.0 }],
            vec![PriceLevel { price: 100.0, quantity: 1.0 }],
        );
        assert!(matches!(result, Err(SimulatorError::CrossedBook { .. })));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let result = OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![PriceLevel { price: 101.0, quantity: -1.0 }],
            vec![],
        );
        assert!(matches!(result, Err(SimulatorError::Parse(_))));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let book = OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![
                PriceLevel { price: 103.0, quantity: 1.0 },
                PriceLevel { price: 101.0, quantity: 1.0 },
            ],
            vec![
                PriceLevel { price: 98.0, quantity: 1.0 },
                PriceLevel { price: 100.0, quantity: 1.0 },
            ],
        )
        .unwrap();
        assert_eq!(book.best_ask().unwrap(), 101.0);
        assert_eq!(book.best_bid().unwrap(), 100.0);
    }

    #[test]
    fn test_empty_side_errors() {
        let book = OrderBook::new(
            "OKX".to_string(),
            "BTC-USDT".to_string(),
            Utc::now(),
            vec![],
            vec![PriceLevel { price: 100.0, quantity: 1.0 }],
        )
        .unwrap();
        assert!(matches!(book.best_ask(), Err(SimulatorError::EmptyBook("ask"))));
        assert!(book.mid_price().is_err());
    }

    #[test]
    fn test_depth_at_price_monotone_in_offset() {
        let book = sample_book();
        let narrow = book.depth_at_price(0.5, Side::Buy).unwrap();
        let wide = book.depth_at_price(1.5, Side::Buy).unwrap();
        assert_eq!(narrow, 1.0);
        assert_eq!(wide, 5.0);
        assert!(wide >= narrow);
    }

    #[test]
    fn test_vwap_walks_levels() {
        let book = sample_book();
        // Buying 2.0: 1.0 @ 101 + 1.0 @ 102
        let (vwap, filled) = book.vwap(2.0, Side::Buy).unwrap();
        assert_eq!(filled, 2.0);
        assert!((vwap - 101.5).abs() < 1e-9);

        // Selling 2.0 fills entirely at the best bid
        let (vwap, filled) = book.vwap(2.0, Side::Sell).unwrap();
        assert_eq!(filled, 2.0);
        assert!((vwap - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_partial_fill() {
        let book = sample_book();
        let (_, filled) = book.vwap(100.0, Side::Buy).unwrap();
        assert_eq!(filled, 5.0);
    }
}
