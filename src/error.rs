//! Unified error handling for the trade cost simulator
//!
//! Recoverable errors (feed, parse, book integrity) are absorbed at their
//! origin and surfaced as counters plus log events; only request validation
//! and configuration errors propagate to simulate_trade callers.

use thiserror::Error;

/// Main error type for the simulator. Clone keeps a shared computation's
/// outcome deliverable to every waiter.
#[derive(Debug, Clone, Error)]
pub enum SimulatorError {
    #[error("Feed connection error: {0}")]
    Connection(String),

    #[error("Failed to parse feed message: {0}")]
    Parse(String),

    #[error("Order book has no {0} levels")]
    EmptyBook(&'static str),

    #[error("Crossed order book: best bid {bid} >= best ask {ask}")]
    CrossedBook { bid: f64, ask: f64 },

    #[error("Stale update: timestamp {received} not after {current}")]
    StaleUpdate { received: String, current: String },

    #[error("Degenerate model input: {0}")]
    DegenerateInput(String),

    #[error("Invalid request parameter '{0}': {1}")]
    Validation(String, String),

    #[error("Unknown fee tier: {0}")]
    UnknownTier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimulatorError {
    /// Recoverable errors never terminate ingestion; they become counters
    /// and log events while the prior snapshot is retained.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimulatorError::Connection(_)
                | SimulatorError::Parse(_)
                | SimulatorError::EmptyBook(_)
                | SimulatorError::CrossedBook { .. }
                | SimulatorError::StaleUpdate { .. }
                | SimulatorError::DegenerateInput(_)
        )
    }

    /// Error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            SimulatorError::Connection(_) => "connection",
            SimulatorError::Parse(_) => "parse",
            SimulatorError::EmptyBook(_)
            | SimulatorError::CrossedBook { .. }
            | SimulatorError::StaleUpdate { .. } => "book",
            SimulatorError::DegenerateInput(_) => "model",
            SimulatorError::Validation(_, _) => "validation",
            SimulatorError::UnknownTier(_) => "fees",
            SimulatorError::Config(_) => "config",
            SimulatorError::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for SimulatorError {
    fn from(err: serde_json::Error) -> Self {
        SimulatorError::Parse(format!("JSON error: {}", err))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SimulatorError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SimulatorError::Connection(err.to_string())
    }
}

/// Result type alias using SimulatorError
pub type SimResult<T> = Result<T, SimulatorError>;
