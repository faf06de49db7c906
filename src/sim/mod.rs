// Simulation orchestration: caching, latency accounting, and the
// trade simulator itself

pub mod cache;
pub mod latency;
pub mod simulator;

pub use cache::{CacheStats, ResultCache};
pub use latency::{LatencyStats, LatencyTracker};
pub use simulator::{CallOutcomes, PerformanceReport, SimulatorState, TradeSimulator};
