// WebSocket client for the exchange L2 order book feed
//
// Runs until an explicit shutdown signal. Unexpected disconnects trigger
// exponential backoff reconnects (base doubling up to a cap, with jitter)
// with unlimited retries. Malformed messages are counted and dropped; the
// last published snapshot is retained across disconnects and simply ages.

use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::{SimResult, SimulatorError};
use crate::feed::parser::{self, FeedMessage};
use crate::market::MetricsProcessor;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Feed throughput and error counters, shared with the simulator's
/// performance report
#[derive(Debug, Default)]
pub struct FeedStats {
    pub messages_received: AtomicU64,
    pub control_messages: AtomicU64,
    pub parse_errors: AtomicU64,
    pub rejected_updates: AtomicU64,
    pub reconnects: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedStatsSnapshot {
    pub messages_received: u64,
    pub control_messages: u64,
    pub parse_errors: u64,
    pub rejected_updates: u64,
    pub reconnects: u64,
}

impl FeedStats {
    pub fn snapshot(&self) -> FeedStatsSnapshot {
        FeedStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            control_messages: self.control_messages.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            rejected_updates: self.rejected_updates.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

pub struct FeedClient {
    url: String,
    config: FeedConfig,
    processor: Arc<MetricsProcessor>,
    stats: Arc<FeedStats>,
}

impl FeedClient {
    pub fn new(config: FeedConfig, processor: Arc<MetricsProcessor>) -> Self {
        let url = config.ws_url.replace("{symbol}", &config.symbol);
        Self {
            url,
            config,
            processor,
            stats: Arc::new(FeedStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<FeedStats> {
        self.stats.clone()
    }

    /// Connect, subscribe, and pump messages until shutdown. Reconnects
    /// forever on failure; only the shutdown signal ends the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff_secs = self.config.reconnect_base_secs;

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect().await {
                Ok(ws) => {
                    info!("✅ Connected to feed: {}", self.url);
                    backoff_secs = self.config.reconnect_base_secs;

                    self.receive_loop(ws, &mut shutdown).await;

                    if *shutdown.borrow() {
                        break;
                    }
                    warn!("Feed disconnected, scheduling reconnect");
                }
                Err(e) => {
                    warn!("Feed connection failed: {}", e);
                }
            }

            self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
            let jitter: f64 = rand::thread_rng().gen_range(0.8..1.2);
            let delay = Duration::from_secs_f64(backoff_secs as f64 * jitter);
            info!("🔄 Reconnecting in {:.1}s", delay.as_secs_f64());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }

            backoff_secs = (backoff_secs * 2).min(self.config.reconnect_cap_secs);
        }

        info!("Feed client stopped");
    }

    async fn connect(&self) -> SimResult<WsStream> {
        let (ws, _) = connect_async(&self.url).await?;
        Ok(ws)
    }

    async fn receive_loop(&self, ws: WsStream, shutdown: &mut watch::Receiver<bool>) {
        let (mut sender, mut receiver) = ws.split();
        let mut ping_interval =
            tokio::time::interval(Duration::from_secs(self.config.ping_interval_secs));
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                message = receiver.next() => {
                    match message {
                        Some(Ok(Message::Text(raw))) => self.handle_message(&raw),
                        Some(Ok(Message::Ping(payload))) => {
                            if sender.send(Message::Pong(payload)).await.is_err() {
                                return;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Feed sent close frame: {:?}", frame);
                            return;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Feed receive error: {}", e);
                            return;
                        }
                        None => return,
                    }
                }
                _ = ping_interval.tick() => {
                    let ping = json!({"op": "ping"}).to_string();
                    if sender.send(Message::Text(ping)).await.is_err() {
                        return;
                    }
                }
                _ = shutdown.changed() => {
                    let _ = sender.send(Message::Close(None)).await;
                    return;
                }
            }
        }
    }

    /// Parse and dispatch one message. Errors here never terminate the
    /// loop; they become counters and log events.
    fn handle_message(&self, raw: &str) {
        match parser::parse(raw) {
            Ok(FeedMessage::Snapshot(book)) => {
                self.stats.messages_received.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = self.processor.process(book) {
                    self.stats.rejected_updates.fetch_add(1, Ordering::Relaxed);
                    match e {
                        SimulatorError::StaleUpdate { .. } => {
                            debug!("Discarded stale update: {}", e)
                        }
                        _ => warn!("Rejected order book update: {}", e),
                    }
                }
            }
            Ok(FeedMessage::Control(event)) => {
                self.stats.control_messages.fetch_add(1, Ordering::Relaxed);
                debug!("Feed control message: {}", event);
            }
            Err(e) => {
                self.stats.parse_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Dropped unparsable message: {}", e);
            }
        }
    }
}
