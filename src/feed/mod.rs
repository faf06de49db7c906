// Market feed ingestion: WebSocket client and snapshot parser

pub mod client;
pub mod parser;

pub use client::{FeedClient, FeedStats, FeedStatsSnapshot};
pub use parser::{parse, FeedMessage};
