// Trade cost simulator
//
// Orchestrates the cost models against the latest market snapshot. Each
// simulation prices against exactly one published (book, metrics) pair;
// identical requests against the same book are served from the result
// cache, and concurrent identical misses share one computation.

use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{SimResult, SimulatorError};
use crate::feed::FeedStats;
use crate::market::{MarketMetrics, MarketSnapshot, MetricsProcessor, OrderBook};
use crate::models::{
    AlmgrenChrissModel, CostModel, FeeCalculator, MakerTakerEstimator, SlippageModel,
};
use crate::types::{BatchResult, SimulationRequest, SimulationResult, StageLatencies, Variation};

use super::cache::{fingerprint, CacheStats, ResultCache};
use super::latency::{LatencyStats, LatencyTracker};

// How long a waiter blocks on another caller's identical in-flight
// computation before giving up. The computation itself is never cancelled.
const WAIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Shared in-flight computation. The owner publishes exactly once;
/// waiters sleep on the condvar until then or until their timeout.
struct Flight {
    outcome: OnceLock<SimResult<Arc<SimulationResult>>>,
    done: Mutex<bool>,
    ready: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            done: Mutex::new(false),
            ready: Condvar::new(),
        }
    }

    fn publish(&self, outcome: SimResult<Arc<SimulationResult>>) {
        let _ = self.outcome.set(outcome);
        let mut done = self.done.lock().expect("flight lock poisoned");
        *done = true;
        self.ready.notify_all();
    }

    /// Blocks until the outcome is published; None once the timeout elapses
    fn wait(&self, timeout: Duration) -> Option<SimResult<Arc<SimulationResult>>> {
        let done = self.done.lock().expect("flight lock poisoned");
        let _guard = self
            .ready
            .wait_timeout_while(done, timeout, |done| !*done)
            .expect("flight lock poisoned");
        self.outcome.get().cloned()
    }
}

/// Observable simulator state; Computing while a model evaluation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulatorState {
    Idle,
    Computing,
}

/// Per-call outcome counters: every simulate_trade call lands in exactly
/// one bucket.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CallOutcomes {
    pub cached: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Point-in-time performance report for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct PerformanceReport {
    pub state: SimulatorState,
    pub simulations: u64,
    pub failures: u64,
    pub outcomes: CallOutcomes,
    pub cache: CacheStats,
    pub latency: std::collections::BTreeMap<String, LatencyStats>,
    pub feed: Option<crate::feed::FeedStatsSnapshot>,
}

pub struct TradeSimulator {
    config: Config,
    processor: Arc<MetricsProcessor>,
    slippage: SlippageModel,
    impact: AlmgrenChrissModel,
    maker_taker: MakerTakerEstimator,
    fees: FeeCalculator,
    cache: ResultCache,
    in_flight: Mutex<HashMap<u64, Arc<Flight>>>,
    latency: LatencyTracker,
    state: AtomicU8,
    simulations: AtomicU64,
    failures: AtomicU64,
    cached_calls: AtomicU64,
    last_calibrated_sequence: AtomicU64,
    feed_stats: Option<Arc<FeedStats>>,
}

impl TradeSimulator {
    pub fn new(config: Config, processor: Arc<MetricsProcessor>) -> Self {
        Self {
            slippage: SlippageModel::new(config.slippage.clone()),
            impact: AlmgrenChrissModel::new(config.impact.clone()),
            maker_taker: MakerTakerEstimator::new(config.maker_taker.clone()),
            fees: FeeCalculator::new(config.fee_tiers.clone()),
            cache: ResultCache::new(config.simulator.cache_capacity),
            in_flight: Mutex::new(HashMap::new()),
            latency: LatencyTracker::new(),
            state: AtomicU8::new(0),
            simulations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            cached_calls: AtomicU64::new(0),
            last_calibrated_sequence: AtomicU64::new(0),
            feed_stats: None,
            config,
            processor,
        }
    }

    /// Attach feed counters so they appear in the performance report
    pub fn with_feed_stats(mut self, stats: Arc<FeedStats>) -> Self {
        self.feed_stats = Some(stats);
        self
    }

    /// Feed one validated order book into the shared market state. Normally
    /// driven by the feed client; exposed for direct and offline use.
    pub fn update_market_data(&self, book: OrderBook) -> SimResult<Arc<MarketMetrics>> {
        self.processor.process(book)
    }

    /// Price one order against the latest market snapshot.
    ///
    /// Identical requests against an unchanged book return the cached
    /// result. A concurrent identical miss joins the in-flight computation
    /// instead of duplicating it.
    pub fn simulate_trade(&self, request: &SimulationRequest) -> SimResult<Arc<SimulationResult>> {
        self.simulate_trade_with_timeout(request, WAIT_TIMEOUT)
    }

    /// Like `simulate_trade`, but a caller joining another caller's
    /// in-flight computation gives up after `wait_timeout`. The computation
    /// itself keeps running and still populates the cache.
    pub fn simulate_trade_with_timeout(
        &self,
        request: &SimulationRequest,
        wait_timeout: Duration,
    ) -> SimResult<Arc<SimulationResult>> {
        request.validate()?;

        let snapshot = self
            .processor
            .current_snapshot()
            .ok_or(SimulatorError::EmptyBook("published"))?;

        self.recalibrate(&snapshot);

        let volatility = self.processor.volatility_estimate().current();
        let key = fingerprint(
            request,
            volatility,
            snapshot.book.sequence,
            &self.config.simulator,
        );

        let lookup_start = Instant::now();
        let hit = self.cache.get(key);
        let lookup_ms = elapsed_ms(lookup_start);
        if let Some(cached) = hit {
            self.latency.record("cache_lookup", lookup_ms);
            self.cached_calls.fetch_add(1, Ordering::Relaxed);
            debug!("Cache hit for {} seq={}", request.symbol, snapshot.book.sequence);
            return Ok(cached);
        }

        let (flight, owner) = {
            let mut in_flight = self.in_flight.lock().expect("in-flight lock poisoned");
            match in_flight.entry(key) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    (entry.insert(Arc::new(Flight::new())).clone(), true)
                }
            }
        };

        if owner {
            self.state.store(SimulatorState::Computing as u8, Ordering::Relaxed);
            let computed = self.compute(request, &snapshot);
            self.state.store(SimulatorState::Idle as u8, Ordering::Relaxed);
            match &computed {
                Ok(result) => self.cache.insert(key, result.clone()),
                Err(_) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            flight.publish(computed.clone());

            self.in_flight
                .lock()
                .expect("in-flight lock poisoned")
                .remove(&key);

            return computed;
        }

        // Waiter path: block on the owner's flight until it publishes
        match flight.wait(wait_timeout) {
            Some(outcome) => outcome,
            None => Err(SimulatorError::Internal(
                "timed out waiting for in-flight simulation".to_string(),
            )),
        }
    }

    /// Idle unless a model evaluation is running right now
    pub fn state(&self) -> SimulatorState {
        if self.state.load(Ordering::Relaxed) == SimulatorState::Computing as u8 {
            SimulatorState::Computing
        } else {
            SimulatorState::Idle
        }
    }

    /// Run a labelled parameter sweep against one market snapshot view.
    /// Results preserve the declared variation order.
    pub fn start_batch_simulation(
        &self,
        base: &SimulationRequest,
        variations: &[Variation],
    ) -> SimResult<BatchResult> {
        base.validate()?;
        let started_at = Utc::now();

        let mut results = Vec::with_capacity(variations.len());
        for variation in variations {
            let request = variation.apply(base);
            let result = self.simulate_trade(&request)?;
            results.push((variation.label.clone(), result));
        }

        info!("📦 Batch of {} variations completed", results.len());
        Ok(BatchResult { started_at, results })
    }

    pub fn get_performance_metrics(&self) -> PerformanceReport {
        PerformanceReport {
            state: self.state(),
            simulations: self.simulations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            outcomes: CallOutcomes {
                cached: self.cached_calls.load(Ordering::Relaxed),
                completed: self.simulations.load(Ordering::Relaxed),
                failed: self.failures.load(Ordering::Relaxed),
            },
            cache: self.cache.stats(),
            latency: self.latency.all_stats(),
            feed: self.feed_stats.as_ref().map(|s| s.snapshot()),
        }
    }

    /// Feed fresh book data to the slippage calibration at most once per
    /// published sequence.
    fn recalibrate(&self, snapshot: &MarketSnapshot) {
        let sequence = snapshot.book.sequence;
        let seen = self.last_calibrated_sequence.swap(sequence, Ordering::Relaxed);
        if seen != sequence {
            self.slippage.update(&snapshot.book);
        }
    }

    fn compute(
        &self,
        request: &SimulationRequest,
        snapshot: &MarketSnapshot,
    ) -> SimResult<Arc<SimulationResult>> {
        let total_start = Instant::now();
        let mut warnings = Vec::new();

        if snapshot.age() > std::time::Duration::from_secs(self.config.feed.stale_after_secs) {
            warnings.push(format!(
                "market data is stale ({:.1}s old)",
                snapshot.age().as_secs_f64()
            ));
        }

        let metrics = &snapshot.metrics;
        let mid_price = metrics.mid_price;
        let order_value = request.quantity * mid_price;

        let volatility = snapshot.volatility_for(request);
        let depth = snapshot.depth_for(request);

        let stage_start = Instant::now();
        let slippage = CostModel::evaluate(&self.slippage, request, snapshot)?;
        let slippage_ms = elapsed_ms(stage_start);
        if let Some(warning) = &slippage.warning {
            warnings.push(warning.clone());
        }

        let stage_start = Instant::now();
        let impact = CostModel::evaluate(&self.impact, request, snapshot)?;
        let impact_ms = elapsed_ms(stage_start);
        if let Some(warning) = &impact.warning {
            warnings.push(warning.clone());
        }
        // Models without a decomposition report everything as temporary
        let (temporary_impact_pct, permanent_impact_pct) =
            impact.split.unwrap_or((impact.pct, 0.0));

        let stage_start = Instant::now();
        let maker_fraction = self.maker_taker.estimate(
            request.order_type,
            request.side,
            request.quantity,
            depth,
            request.aggressiveness,
        );
        let maker_taker_ms = elapsed_ms(stage_start);

        let stage_start = Instant::now();
        let fees = self
            .fees
            .calculate_fees(order_value, &request.fee_tier, maker_fraction)?;
        let fees_ms = elapsed_ms(stage_start);

        let slippage_cost = slippage.cost;
        let fee_cost = fees.total;
        let total_cost = slippage_cost + impact.cost + fee_cost;
        let total_cost_bps = if order_value > 0.0 {
            total_cost / order_value * 10_000.0
        } else {
            0.0
        };

        let latency = StageLatencies {
            slippage_ms,
            impact_ms,
            maker_taker_ms,
            fees_ms,
            total_ms: elapsed_ms(total_start),
        };
        self.latency.record("slippage", latency.slippage_ms);
        self.latency.record("impact", latency.impact_ms);
        self.latency.record("maker_taker", latency.maker_taker_ms);
        self.latency.record("fees", latency.fees_ms);
        self.latency.record("total", latency.total_ms);
        self.simulations.fetch_add(1, Ordering::Relaxed);

        debug!(
            "💱 {} {:?} {:?} qty={} -> total={:.4} ({:.2} bps)",
            request.symbol,
            request.side,
            request.order_type,
            request.quantity,
            total_cost,
            total_cost_bps
        );

        Ok(Arc::new(SimulationResult {
            timestamp: Utc::now(),
            exchange: request.exchange.clone(),
            symbol: request.symbol.clone(),
            order_type: request.order_type,
            side: request.side,
            quantity: request.quantity,
            fee_tier: request.fee_tier.clone(),
            mid_price,
            spread: metrics.spread,
            volatility,
            order_value,
            expected_slippage_pct: slippage.pct,
            slippage_cost,
            temporary_impact_pct,
            permanent_impact_pct,
            market_impact_cost: impact.cost,
            maker_fraction,
            taker_fraction: 1.0 - maker_fraction,
            fees,
            fee_cost,
            total_cost,
            total_cost_bps,
            latency,
            warnings,
        }))
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
