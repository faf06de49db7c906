// Trade Cost Simulator Library
//
// Real-time execution cost estimation from a live L2 order book feed:
// slippage, market impact, fees, and maker/taker proportions

pub mod config;
pub mod error;   // Unified error handling
pub mod feed;    // WebSocket ingestion and message parsing
pub mod market;  // Order book, metrics, volatility, shared state
pub mod models;  // Cost model components
pub mod sim;     // Orchestration, caching, latency accounting
pub mod types;

// Re-export error types
pub use error::{SimResult, SimulatorError};

// Re-export configuration
pub use config::{Config, ConfigError};

// Re-export market data components
pub use market::{
    MarketDataHandle, MarketMetrics, MarketSnapshot, MetricsProcessor, OrderBook, PriceLevel,
    VolatilityEstimate, VolatilityEstimator,
};

// Re-export feed components
pub use feed::{FeedClient, FeedStats, FeedStatsSnapshot};

// Re-export cost models
pub use models::{
    AlmgrenChrissModel, CostComponent, CostModel, FeeCalculator, MakerTakerEstimator,
    SlippageModel,
};

// Re-export simulation components
pub use sim::{CallOutcomes, PerformanceReport, SimulatorState, TradeSimulator};
pub use types::{
    BatchResult, OrderType, Side, SimulationRequest, SimulationResult, Variation,
};
