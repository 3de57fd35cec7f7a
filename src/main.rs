// =============================================================================
// icc-autotrader — backtest demo driver
// =============================================================================
//
// Loads a historical candle file and feeds it through a `Trader` bar by
// bar, exactly as a live scheduler would feed it live closes. There is no
// broker connectivity, dashboard, or alert channel here — those are
// external collaborators built against the `BrokerAdapter`/`AlertSink`
// seams and the `trader::Snapshot` this binary prints at the end.

use std::fs::File;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use icc_autotrader::broker::BacktestBroker;
use icc_autotrader::candle::Candle;
use icc_autotrader::config::AppConfig;
use icc_autotrader::trader::Trader;

/// Run the ICC strategy over a historical candle CSV and print the
/// resulting session snapshot.
#[derive(Parser, Debug)]
#[command(name = "icc-autotrader", version, about)]
struct Cli {
    /// CSV file with columns: timestamp,open,high,low,close,volume
    #[arg(short, long)]
    candles: PathBuf,

    /// Path to a JSON config file (strategy/risk/instrument). Falls back to
    /// defaults if missing.
    #[arg(short = 'g', long, default_value = "config.json")]
    config: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CandleRecord {
    fn into_candle(self, symbol: &str) -> Candle {
        Candle::new(self.timestamp, self.open, self.high, self.low, self.close, self.volume, symbol)
    }
}

fn load_candles(path: &PathBuf, symbol: &str) -> anyhow::Result<Vec<Candle>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut candles = Vec::new();
    for result in reader.deserialize() {
        let record: CandleRecord = result?;
        candles.push(record.into_candle(symbol));
    }
    Ok(candles)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("icc-autotrader backtest driver starting");

    let config = AppConfig::load(&cli.config);
    let candles = load_candles(&cli.candles, &config.instrument.symbol)?;
    if candles.is_empty() {
        warn!(path = %cli.candles.display(), "no candles loaded, nothing to do");
        return Ok(());
    }
    info!(count = candles.len(), "candles loaded");

    let broker = Box::new(
        BacktestBroker::new(config.risk.slippage_ticks, config.risk.commission_per_side)
            .with_tick_size(config.instrument.tick_size),
    );

    let mut trader = Trader::new(config.strategy.clone(), config.risk.clone(), config.instrument, broker, None);
    trader.start_session();

    for candle in &candles {
        trader.on_candle(candle.clone());
    }

    if let Some(last) = candles.last() {
        trader.stop_session(last.close);
    }

    let snapshot = trader.get_snapshot();
    info!(
        fsm_state = %snapshot.fsm_state,
        daily_pnl = snapshot.daily_pnl,
        trade_count = snapshot.trade_count,
        is_flat = snapshot.is_flat,
        candle_count = snapshot.candle_count,
        risk_killed = snapshot.risk_killed,
        "backtest complete"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
