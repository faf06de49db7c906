// Shared helpers for integration tests
#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

use trade_cost_sim::market::{MarketDataHandle, MetricsProcessor, OrderBook, PriceLevel};
use trade_cost_sim::{Config, TradeSimulator};

pub fn test_config() -> Config {
    Config::default()
}

/// Processor plus simulator wired the way the binary wires them
pub fn build_stack() -> (Arc<TradeSimulator>, Arc<MetricsProcessor>) {
    let config = test_config();
    let handle = Arc::new(MarketDataHandle::new(Duration::from_secs(
        config.feed.stale_after_secs,
    )));
    let processor = Arc::new(MetricsProcessor::new(handle, &config.volatility));
    let simulator = Arc::new(TradeSimulator::new(config, processor.clone()));
    (simulator, processor)
}

pub fn levels(pairs: &[(f64, f64)]) -> Vec<PriceLevel> {
    pairs
        .iter()
        .map(|&(price, quantity)| PriceLevel { price, quantity })
        .collect()
}

pub fn book_at(
    timestamp: DateTime<Utc>,
    asks: &[(f64, f64)],
    bids: &[(f64, f64)],
) -> OrderBook {
    OrderBook::new(
        "OKX".to_string(),
        "BTC-USDT".to_string(),
        timestamp,
        levels(asks),
        levels(bids),
    )
    .expect("test book must be valid")
}

/// Publish a two-level book shifted by `offset_ms` from now
pub fn publish_sample(processor: &MetricsProcessor, offset_ms: i64) {
    let book = book_at(
        Utc::now() + ChronoDuration::milliseconds(offset_ms),
        &[(101.0, 1.0), (102.0, 4.0)],
        &[(100.0, 2.0), (99.0, 3.0)],
    );
    processor.process(book).expect("publish must succeed");
}
