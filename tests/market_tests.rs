// Ingestion pipeline: raw message -> parsed book -> published metrics

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{book_at, build_stack};
use trade_cost_sim::feed::{parse, FeedMessage};
use trade_cost_sim::{Side, SimulatorError};

fn snapshot_json(timestamp: &str, asks: &str, bids: &str) -> String {
    format!(
        r#"{{
            "timestamp": "{}",
            "exchange": "OKX",
            "symbol": "BTC-USDT",
            "asks": {},
            "bids": {}
        }}"#,
        timestamp, asks, bids
    )
}

#[test]
fn test_parsed_snapshot_publishes_metrics() {
    let (_, processor) = build_stack();
    let raw = snapshot_json(
        "2025-05-04T10:39:13Z",
        r#"[["101", "1"], ["102", "4"]]"#,
        r#"[["100", "2"], ["99", "3"]]"#,
    );

    let book = match parse(&raw).expect("parse") {
        FeedMessage::Snapshot(book) => book,
        other => panic!("expected snapshot, got {:?}", other),
    };
    let metrics = processor.process(book).expect("process");

    assert_eq!(metrics.mid_price, 100.5);
    assert_eq!(metrics.spread, 1.0);
    assert_eq!(metrics.bid_depth, 5.0);
    assert_eq!(metrics.ask_depth, 5.0);
}

#[test]
fn test_replacement_semantics() {
    let (_, processor) = build_stack();
    let now = Utc::now();

    processor
        .process(book_at(now, &[(101.0, 1.0)], &[(100.0, 2.0)]))
        .expect("first snapshot");
    processor
        .process(book_at(
            now + ChronoDuration::milliseconds(10),
            &[(103.0, 7.0)],
            &[(102.0, 5.0)],
        ))
        .expect("second snapshot");

    // Second snapshot fully replaces the first; nothing merges
    let book = processor.current_orderbook().expect("book");
    assert_eq!(book.best_bid().expect("bid"), 102.0);
    assert_eq!(book.best_ask().expect("ask"), 103.0);
    assert_eq!(book.bids.len(), 1);
    assert_eq!(book.sequence, 2);
}

#[test]
fn test_out_of_order_updates_keep_prior_snapshot() {
    let (_, processor) = build_stack();
    let now = Utc::now();

    processor
        .process(book_at(now, &[(101.0, 1.0)], &[(100.0, 2.0)]))
        .expect("first snapshot");

    let stale = processor.process(book_at(
        now - ChronoDuration::seconds(1),
        &[(200.0, 1.0)],
        &[(199.0, 1.0)],
    ));
    assert!(matches!(stale, Err(SimulatorError::StaleUpdate { .. })));

    let book = processor.current_orderbook().expect("book");
    assert_eq!(book.best_bid().expect("bid"), 100.0);
}

#[test]
fn test_volatility_builds_from_stream() {
    let (_, processor) = build_stack();
    let start = Utc::now();

    for i in 0..20 {
        let wiggle = if i % 2 == 0 { 0.0 } else { 1.5 };
        processor
            .process(book_at(
                start + ChronoDuration::milliseconds(i * 100),
                &[(101.0 + wiggle, 1.0)],
                &[(100.0 + wiggle, 2.0)],
            ))
            .expect("snapshot");
    }

    let estimate = processor.volatility_estimate();
    assert!(estimate.samples >= 20);
    assert!(estimate.realized > 0.0);
    assert!(estimate.ewma > 0.0);

    // Published metrics carry the estimate
    let metrics = processor.current_metrics().expect("metrics");
    assert!(metrics.volatility > 0.0);
}

#[test]
fn test_depth_walks_and_vwap() {
    let now = Utc::now();
    let book = book_at(
        now,
        &[(101.0, 1.0), (102.0, 4.0)],
        &[(100.0, 2.0), (99.0, 3.0)],
    );

    // Walking 3 units of the ask side: 1 @ 101 + 2 @ 102
    let (vwap, filled) = book.vwap(3.0, Side::Buy).expect("vwap");
    assert_eq!(filled, 3.0);
    assert!((vwap - (101.0 + 2.0 * 102.0) / 3.0).abs() < 1e-9);

    // Depth within 0.01 of the best bid: only the 100.0 level
    let near = book.depth_at_price(0.01, Side::Sell).expect("depth");
    assert_eq!(near, 2.0);
}
