// Derives point-in-time market metrics from each order book snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::config::VolatilityConfig;
use crate::error::{SimResult, SimulatorError};

use super::order_book::OrderBook;
use super::state::{MarketDataHandle, MarketSnapshot};
use super::volatility::{VolatilityEstimate, VolatilityEstimator};

/// Metrics recomputed on every order book replacement. Never mutated in
/// place; a new instance replaces the old.
#[derive(Debug, Clone, Serialize)]
pub struct MarketMetrics {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub mid_price: f64,
    pub spread: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
    /// Latest volatility estimate (per-sample fraction)
    pub volatility: f64,
}

/// Owns the volatility estimator and the publication of snapshots to the
/// shared market state handle. One processor per feed stream.
pub struct MetricsProcessor {
    handle: Arc<MarketDataHandle>,
    volatility: Mutex<VolatilityEstimator>,
    last_feed_timestamp: Mutex<Option<DateTime<Utc>>>,
    sequence: AtomicU64,
}

impl MetricsProcessor {
    pub fn new(handle: Arc<MarketDataHandle>, volatility_config: &VolatilityConfig) -> Self {
        Self {
            handle,
            volatility: Mutex::new(VolatilityEstimator::new(volatility_config)),
            last_feed_timestamp: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    /// Process one validated order book snapshot: enforce feed-timestamp
    /// ordering, derive metrics, feed the volatility estimator, and publish
    /// the new (book, metrics) pair atomically.
    pub fn process(&self, mut book: OrderBook) -> SimResult<Arc<MarketMetrics>> {
        // Within a single stream, metrics derive from strictly increasing
        // feed timestamps; duplicates and reordered messages are discarded.
        {
            let mut last = self
                .last_feed_timestamp
                .lock()
                .expect("feed timestamp lock poisoned");
            if let Some(current) = *last {
                if book.timestamp <= current {
                    return Err(SimulatorError::StaleUpdate {
                        received: book.timestamp.to_rfc3339(),
                        current: current.to_rfc3339(),
                    });
                }
            }
            *last = Some(book.timestamp);
        }

        book.sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        let mid_price = book.mid_price()?;
        let spread = book.spread()?;

        let estimate = {
            let mut vol = self.volatility.lock().expect("volatility lock poisoned");
            vol.add_price(book.timestamp, mid_price);
            vol.estimate()
        };

        let metrics = Arc::new(MarketMetrics {
            timestamp: book.timestamp,
            symbol: book.symbol.clone(),
            mid_price,
            spread,
            bid_depth: book.bid_depth(),
            ask_depth: book.ask_depth(),
            volatility: estimate.current(),
        });

        debug!(
            "📊 {} seq={} mid={:.2} spread={:.4} depth={:.2}/{:.2} vol={:.6}",
            metrics.symbol,
            book.sequence,
            mid_price,
            spread,
            metrics.bid_depth,
            metrics.ask_depth,
            metrics.volatility
        );

        self.handle.publish(Arc::new(book), metrics.clone());
        Ok(metrics)
    }

    /// Latest published metrics, without blocking the writer
    pub fn current_metrics(&self) -> Option<Arc<MarketMetrics>> {
        self.handle.snapshot().map(|s| s.metrics)
    }

    /// Latest published order book, without blocking the writer
    pub fn current_orderbook(&self) -> Option<Arc<OrderBook>> {
        self.handle.snapshot().map(|s| s.book)
    }

    pub fn current_snapshot(&self) -> Option<MarketSnapshot> {
        self.handle.snapshot()
    }

    pub fn volatility_estimate(&self) -> VolatilityEstimate {
        self.volatility
            .lock()
            .expect("volatility lock poisoned")
            .estimate()
    }
}
