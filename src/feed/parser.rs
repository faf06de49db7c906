// Converts raw feed messages into validated order book snapshots
//
// Full-snapshot semantics: each message carries the complete L2 book and
// replaces the previous one. The exchange sends prices and quantities as
// strings; numeric payloads are accepted too.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{SimResult, SimulatorError};
use crate::market::order_book::{OrderBook, PriceLevel};

/// Outcome of classifying one inbound message
#[derive(Debug)]
pub enum FeedMessage {
    Snapshot(OrderBook),
    /// Subscription acks, pongs and similar; logged and skipped
    Control(String),
}

pub fn parse(raw: &str) -> SimResult<FeedMessage> {
    let data: Value = serde_json::from_str(raw)?;

    if let Some(event) = data.get("event").and_then(|e| e.as_str()) {
        return Ok(FeedMessage::Control(event.to_string()));
    }

    let exchange = data
        .get("exchange")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let symbol = data
        .get("symbol")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SimulatorError::Parse("missing symbol".to_string()))?
        .to_string();

    let timestamp = parse_timestamp(&data)?;
    let asks = parse_levels(&data, "asks")?;
    let bids = parse_levels(&data, "bids")?;

    let book = OrderBook::new(exchange, symbol, timestamp, asks, bids)?;
    Ok(FeedMessage::Snapshot(book))
}

fn parse_timestamp(data: &Value) -> SimResult<DateTime<Utc>> {
    let raw = data
        .get("timestamp")
        .ok_or_else(|| SimulatorError::Parse("missing timestamp".to_string()))?;

    if let Some(s) = raw.as_str() {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| SimulatorError::Parse(format!("bad timestamp '{}': {}", s, e)))
    } else if let Some(millis) = raw.as_i64() {
        DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| SimulatorError::Parse(format!("bad epoch timestamp {}", millis)))
    } else {
        Err(SimulatorError::Parse("unsupported timestamp type".to_string()))
    }
}

fn parse_levels(data: &Value, side: &str) -> SimResult<Vec<PriceLevel>> {
    let array = data
        .get(side)
        .and_then(|v| v.as_array())
        .ok_or_else(|| SimulatorError::Parse(format!("missing {} array", side)))?;

    let mut levels = Vec::with_capacity(array.len());
    for entry in array {
        let pair = entry
            .as_array()
            .filter(|a| a.len() >= 2)
            .ok_or_else(|| SimulatorError::Parse(format!("malformed {} level", side)))?;

        levels.push(PriceLevel {
            price: parse_number(&pair[0], side, "price")?,
            quantity: parse_number(&pair[1], side, "quantity")?,
        });
    }
    Ok(levels)
}

fn parse_number(value: &Value, side: &str, field: &str) -> SimResult<f64> {
    let parsed = if let Some(s) = value.as_str() {
        s.parse::<f64>().ok()
    } else {
        value.as_f64()
    };

    match parsed {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        Some(n) => Err(SimulatorError::Parse(format!(
            "negative or non-finite {} {} on {} side",
            field, n, side
        ))),
        None => Err(SimulatorError::Parse(format!(
            "non-numeric {} on {} side",
            field, side
        ))),
    }
}
