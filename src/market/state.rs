// Shared "current market state" holder
//
// The single piece of state shared between the ingestion task and the
// simulator. Updated by atomic snapshot replacement: readers always see a
// complete (book, metrics) pair, possibly slightly stale, never torn.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::types::SimulationRequest;

use super::metrics::MarketMetrics;
use super::order_book::OrderBook;

/// Immutable view of the latest market state
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub book: Arc<OrderBook>,
    pub metrics: Arc<MarketMetrics>,
    /// When this snapshot was published, for staleness checks. Local
    /// monotonic basis: exchange timestamps can skew against the local
    /// clock, and staleness here means "the feed stopped delivering".
    published_at: Instant,
}

impl MarketSnapshot {
    pub fn age(&self) -> Duration {
        self.published_at.elapsed()
    }

    /// Volatility used to price a request: the override wins over the
    /// published estimate.
    pub fn volatility_for(&self, request: &SimulationRequest) -> f64 {
        request
            .volatility_override
            .unwrap_or(self.metrics.volatility)
    }

    /// Executable depth for a request: the override wins over the book
    pub fn depth_for(&self, request: &SimulationRequest) -> f64 {
        request
            .depth_override
            .unwrap_or_else(|| self.book.executable_depth(request.side))
    }
}

/// Handle passed to both the ingestion task and the simulator at
/// construction. Last write wins; a disconnect does not clear the
/// snapshot, it only ages it.
#[derive(Debug)]
pub struct MarketDataHandle {
    current: RwLock<Option<MarketSnapshot>>,
    stale_after: Duration,
}

impl MarketDataHandle {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            stale_after,
        }
    }

    /// Replace the current snapshot. Writer holds the lock only for the
    /// pointer swap; readers clone Arcs out.
    pub fn publish(&self, book: Arc<OrderBook>, metrics: Arc<MarketMetrics>) {
        let snapshot = MarketSnapshot {
            book,
            metrics,
            published_at: Instant::now(),
        };
        *self.current.write().expect("market state lock poisoned") = Some(snapshot);
    }

    /// Latest snapshot, if any has been published yet
    pub fn snapshot(&self) -> Option<MarketSnapshot> {
        self.current
            .read()
            .expect("market state lock poisoned")
            .clone()
    }

    /// Age of the current snapshot
    pub fn age(&self) -> Option<Duration> {
        self.snapshot().map(|s| s.age())
    }

    /// True once the snapshot is older than the configured threshold,
    /// e.g. after a feed disconnect
    pub fn is_stale(&self) -> bool {
        match self.age() {
            Some(age) => age > self.stale_after,
            None => true,
        }
    }
}
