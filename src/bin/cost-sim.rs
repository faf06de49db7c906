// Trade Cost Simulator - CLI
// Single entry point: live cost streaming, one-shot sweeps, workspace setup

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use trade_cost_sim::market::{MarketDataHandle, MetricsProcessor};
use trade_cost_sim::types::Variation;
use trade_cost_sim::{
    Config, FeedClient, OrderType, Side, SimulationRequest, TradeSimulator,
};

#[derive(Parser)]
#[command(name = "cost-sim")]
#[command(version = "0.1.0")]
#[command(about = "Real-time trade cost simulator", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,

    /// Stream the feed and log simulated costs periodically
    Run {
        /// Order side
        #[arg(long, default_value = "buy")]
        side: String,

        /// Order type (market or limit)
        #[arg(long, default_value = "market")]
        order_type: String,

        /// Order quantity in base currency
        #[arg(short, long, default_value = "1.0")]
        quantity: f64,

        /// Fee tier
        #[arg(long, default_value = "VIP1")]
        tier: String,

        /// Seconds between simulations
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Stop after this many minutes (runs until Ctrl-C if omitted)
        #[arg(short, long)]
        minutes: Option<f64>,
    },

    /// Run a quantity sweep against one snapshot and exit
    Sweep {
        /// Comma-separated quantities
        #[arg(short, long, default_value = "0.5,1,2,5,10")]
        quantities: String,

        /// Order side
        #[arg(long, default_value = "buy")]
        side: String,

        /// Fee tier
        #[arg(long, default_value = "VIP1")]
        tier: String,

        /// Seconds to wait for the first snapshot
        #[arg(long, default_value = "30")]
        warmup: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    std::env::set_var("RUST_LOG", log_level);
    tracing_subscriber::fmt::init();

    info!("🚀 Trade Cost Simulator v0.1.0");
    info!("📁 Config: {}", cli.config);

    match cli.command {
        Commands::Init => {
            let config = Config::load_or_create(&cli.config)?;
            info!("✅ Configuration ready for symbol {}", config.feed.symbol);
        }
        Commands::Run { side, order_type, quantity, tier, interval, minutes } => {
            let config = Config::load_or_create(&cli.config)?;
            let request = build_request(&config, &side, &order_type, quantity, &tier)?;
            run_stream(config, request, interval, minutes).await?;
        }
        Commands::Sweep { quantities, side, tier, warmup } => {
            let config = Config::load_or_create(&cli.config)?;
            run_sweep(config, &quantities, &side, &tier, warmup).await?;
        }
    }

    Ok(())
}

fn build_request(
    config: &Config,
    side: &str,
    order_type: &str,
    quantity: f64,
    tier: &str,
) -> Result<SimulationRequest, Box<dyn std::error::Error>> {
    let side = parse_side(side)?;
    let mut request = SimulationRequest::market(&config.feed.symbol, side, quantity, tier);
    request.order_type = match order_type.to_lowercase().as_str() {
        "market" => OrderType::Market,
        "limit" => {
            request.aggressiveness = 0.5;
            OrderType::Limit
        }
        other => return Err(format!("unknown order type: {}", other).into()),
    };
    request.validate()?;
    Ok(request)
}

fn parse_side(side: &str) -> Result<Side, Box<dyn std::error::Error>> {
    match side.to_lowercase().as_str() {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(format!("unknown side: {}", other).into()),
    }
}

/// Wire up feed, processor, and simulator; returns the simulator plus the
/// shutdown sender and the spawned feed task.
fn start_stack(
    config: Config,
) -> (
    Arc<TradeSimulator>,
    watch::Sender<bool>,
    tokio::task::JoinHandle<()>,
) {
    let handle = Arc::new(MarketDataHandle::new(Duration::from_secs(
        config.feed.stale_after_secs,
    )));
    let processor = Arc::new(MetricsProcessor::new(handle, &config.volatility));
    let feed = FeedClient::new(config.feed.clone(), processor.clone());
    let simulator = Arc::new(
        TradeSimulator::new(config, processor).with_feed_stats(feed.stats()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_task = tokio::spawn(async move {
        feed.run(shutdown_rx).await;
    });

    (simulator, shutdown_tx, feed_task)
}

async fn run_stream(
    config: Config,
    request: SimulationRequest,
    interval: u64,
    minutes: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (simulator, shutdown_tx, feed_task) = start_stack(config);

    let deadline = minutes.map(|m| tokio::time::Instant::now() + Duration::from_secs_f64(m * 60.0));
    let mut tick = tokio::time::interval(Duration::from_secs(interval.max(1)));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ticks: u64 = 0;

    info!(
        "💱 Simulating {:?} {:?} qty={} every {}s",
        request.side, request.order_type, request.quantity, interval
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                ticks += 1;
                match simulator.simulate_trade(&request) {
                    Ok(result) => {
                        info!(
                            "💰 mid={:.2} slippage={:.4}% impact={:.4}% fees={:.4} total={:.4} ({:.2} bps) in {:.2}ms",
                            result.mid_price,
                            result.expected_slippage_pct,
                            result.temporary_impact_pct + result.permanent_impact_pct,
                            result.fee_cost,
                            result.total_cost,
                            result.total_cost_bps,
                            result.latency.total_ms
                        );
                        for warning in &result.warnings {
                            warn!("⚠️  {}", warning);
                        }
                    }
                    Err(e) => warn!("Simulation unavailable: {}", e),
                }

                // Periodic performance report
                if ticks % 12 == 0 {
                    let report = simulator.get_performance_metrics();
                    info!(
                        "📊 {} simulations, cache hit ratio {:.1}%, p99 total {:.2}ms",
                        report.simulations,
                        report.cache.hit_ratio * 100.0,
                        report.latency.get("total").map(|s| s.p99_ms).unwrap_or(0.0)
                    );
                }

                if let Some(deadline) = deadline {
                    if tokio::time::Instant::now() >= deadline {
                        info!("⏰ Duration elapsed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Ctrl-C received, shutting down");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = feed_task.await;

    let report = simulator.get_performance_metrics();
    info!("📊 Final report: {}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_sweep(
    config: Config,
    quantities: &str,
    side: &str,
    tier: &str,
    warmup: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let side = parse_side(side)?;
    let symbol = config.feed.symbol.clone();
    let (simulator, shutdown_tx, feed_task) = start_stack(config);

    let variations: Vec<Variation> = quantities
        .split(',')
        .map(|q| -> Result<Variation, Box<dyn std::error::Error>> {
            let quantity: f64 = q.trim().parse()?;
            Ok(Variation::quantity(&format!("qty={}", q.trim()), quantity))
        })
        .collect::<Result<_, _>>()?;

    // Wait for the first published snapshot
    let base = SimulationRequest::market(&symbol, side, 1.0, tier);
    let warmup_deadline = tokio::time::Instant::now() + Duration::from_secs(warmup);
    loop {
        match simulator.simulate_trade(&base) {
            Ok(_) => break,
            Err(e) if tokio::time::Instant::now() >= warmup_deadline => {
                error!("❌ No market data after {}s: {}", warmup, e);
                let _ = shutdown_tx.send(true);
                let _ = feed_task.await;
                return Err(e.into());
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(250)).await,
        }
    }

    let batch = simulator.start_batch_simulation(&base, &variations)?;
    info!("📦 Sweep over {} quantities:", batch.results.len());
    for (label, result) in &batch.results {
        info!(
            "  {} -> slippage={:.4}% impact={:.4}% fees={:.4} total={:.4} ({:.2} bps)",
            label,
            result.expected_slippage_pct,
            result.temporary_impact_pct + result.permanent_impact_pct,
            result.fee_cost,
            result.total_cost,
            result.total_cost_bps
        );
    }

    let _ = shutdown_tx.send(true);
    let _ = feed_task.await;
    Ok(())
}
