// Order book state, derived metrics, and volatility estimation

pub mod metrics;
pub mod order_book;
pub mod state;
pub mod volatility;

pub use metrics::{MarketMetrics, MetricsProcessor};
pub use order_book::{OrderBook, PriceLevel};
pub use state::{MarketDataHandle, MarketSnapshot};
pub use volatility::{VolatilityEstimate, VolatilityEstimator};
