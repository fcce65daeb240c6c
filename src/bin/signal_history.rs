//! Signal History - print the most recent signals from the SQLite log
//!
//! Usage:
//!   cargo run --bin signal_history -- [LIMIT] [SYMBOL]
//!
//! Reads `PUMPWATCH_DB_PATH` (default: pumpwatch.db). Timestamps are shown
//! in `DISPLAY_UTC_OFFSET_HOURS`.

use dotenv::dotenv;
use pumpwatch::pipeline::{config::ScannerConfig, db::SqliteSignalStore, format};
use std::env;

const DEFAULT_LIMIT: usize = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let mut args = env::args().skip(1);
    let limit = match args.next() {
        Some(raw) => raw.parse::<usize>().map_err(|_| format!("invalid LIMIT: {}", raw))?,
        None => DEFAULT_LIMIT,
    };
    let symbol = args.next().map(|s| s.to_uppercase());

    let config = ScannerConfig::from_env();
    let offset = config.display_offset()?;
    let store = SqliteSignalStore::new(&config.db_path)?;

    let signals = match &symbol {
        Some(symbol) => store.signals_for_symbol(symbol, limit)?,
        None => store.recent_signals(limit)?,
    };

    if signals.is_empty() {
        println!("No signals recorded in {}", config.db_path);
        return Ok(());
    }

    println!(
        "{:<19}  {:<12} {:<10} {:>3}  {:>16}  {:>14}  {:<6}",
        "TIME", "SYMBOL", "TYPE", "#", "GAIN %", "PRICE", "VOLUME"
    );

    for signal in &signals {
        let at = format::to_display_time(signal.created_at, offset);
        let gain = if signal.signal_number > 1 {
            format!("{:.2} → {:.2}", signal.previous_percentage, signal.percentage)
        } else {
            format!("{:.2}", signal.percentage)
        };

        println!(
            "{:<19}  {:<12} {:<10} {:>3}  {:>16}  {:>14.8}  {:<6}",
            at.format("%Y-%m-%d %H:%M:%S"),
            signal.symbol,
            signal.signal_type,
            signal.signal_number,
            gain,
            signal.price,
            format::format_volume(signal.volume_24h)
        );
    }

    println!("\n{} signal(s)", signals.len());
    Ok(())
}
