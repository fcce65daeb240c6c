//! Pumpwatch Runtime - Gate.io pump scanner
//!
//! This binary wires the scanning pipeline together:
//! - Loads and validates configuration from the environment
//! - Sends a Telegram connectivity test (startup aborts if it fails)
//! - Initializes the SQLite signal log with schema
//! - Runs the scan scheduler until CTRL+C
//! - Logs aggregate tracking stats on a fixed interval
//!
//! Usage:
//!   cargo run --release --bin pumpwatch
//!
//! Environment variables: see `ScannerConfig::from_env`.

use dotenv::dotenv;
use log::{error, info, warn};
use pumpwatch::pipeline::{
    blocklist::Blocklist,
    config::ScannerConfig,
    db::SqliteSignalStore,
    engine::{ScannerEngine, ScannerHandle, LATEST_SIGNALS_LIMIT},
    error::ScanError,
    gateio::GateioClient,
    notifier::SignalSink,
    scheduler::run_scheduler,
    telegram::TelegramNotifier,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Pumpwatch - Gate.io pump scanner");

    let config = ScannerConfig::from_env();
    config.validate()?;
    let offset = config.display_offset()?;

    info!("✅ Configuration loaded");
    info!("   ├─ Scan interval: {}s", config.scan_interval_secs);
    info!("   ├─ Follow-up interval: {}s", config.followup_interval_secs);
    info!(
        "   ├─ Thresholds: initial {}%, second +{}%, next +{}%, drop {}%",
        config.initial_pump_threshold,
        config.second_signal_threshold,
        config.next_signal_threshold,
        config.drop_threshold
    );
    info!(
        "   ├─ Volume buckets: low < {:.0}, medium < {:.0}",
        config.low_volume_threshold, config.medium_volume_threshold
    );
    info!("   ├─ Quote currency: {}", config.quote_currency);
    info!("   ├─ Blacklist: {}", config.blacklist.join(", "));
    info!("   ├─ Display offset: UTC{:+}", config.display_utc_offset_hours);
    info!("   └─ Database: {}", config.db_path);

    // Collaborators
    let (token, chat_id) = match (&config.telegram_bot_token, &config.telegram_chat_id) {
        (Some(token), Some(chat_id)) => (token.as_str(), chat_id.as_str()),
        _ => {
            return Err(ScanError::Configuration(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set".into(),
            )
            .into())
        }
    };
    let notifier = Arc::new(TelegramNotifier::new(token, chat_id)?);
    let market = Arc::new(GateioClient::new(
        &config.gateio_base_url,
        Blocklist::from_config(&config),
    )?);

    info!("🔧 Initializing database...");
    let store = Arc::new(SqliteSignalStore::open_with_schema(
        &config.db_path,
        &config.schema_dir,
    )?);
    info!("✅ Database initialized");

    let sink = SignalSink::new(notifier, offset).with_observer(store);

    info!("📨 Sending Telegram connectivity test...");
    if !sink.check_connectivity(chrono::Utc::now().timestamp()).await {
        error!("❌ Telegram connectivity test failed, check TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID");
        return Err(ScanError::Configuration("notifier connectivity check failed".into()).into());
    }
    info!("✅ Telegram reachable");

    let engine = ScannerEngine::new(&config, market, sink);
    let handle = engine.handle();

    // Shutdown channel shared by the scheduler and the status task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let status_handle = handle.clone();
    let status_interval = Duration::from_secs(config.status_log_interval_secs.max(1));
    let status_shutdown = shutdown_rx.clone();
    let status_task = tokio::spawn(async move {
        status_log_task(status_handle, status_interval, offset, status_shutdown).await;
    });

    let scan_interval = Duration::from_secs(config.scan_interval_secs);
    let scheduler_task = tokio::spawn(run_scheduler(engine, scan_interval, shutdown_rx));

    info!("🔄 Press CTRL+C to shutdown gracefully");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("");
            info!("⚠️  Received CTRL+C, shutting down...");
        }
        Err(err) => {
            error!("❌ Failed to listen for CTRL+C: {}", err);
        }
    }

    shutdown_tx.send(true).ok();

    // The current tick finishes before the scheduler returns
    match scheduler_task.await {
        Ok(engine) => {
            let stats = engine.table().stats();
            info!(
                "📊 Final state: {} tracked ({} active), {} episodes",
                stats.tracked, stats.active_tracking, stats.total_episodes
            );
        }
        Err(e) => warn!("⚠️  Scheduler task ended abnormally: {}", e),
    }
    status_task.await.ok();

    info!("✅ Pumpwatch stopped");
    Ok(())
}

/// Periodic status log via the read-only handle
async fn status_log_task(
    handle: ScannerHandle,
    every: Duration,
    offset: chrono::FixedOffset,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut timer = interval(every);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately; skip it so the first report has data
    timer.tick().await;

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            _ = shutdown.changed() => break,
        }

        let stats = handle.stats();
        let buckets = handle.volume_buckets();

        info!("📊 Status:");
        info!(
            "   ├─ Tracking: {} active / {} tracked, {} episodes",
            stats.active_tracking, stats.tracked, stats.total_episodes
        );
        info!(
            "   ├─ Snapshot: {} tickers (low {}, medium {}, high {})",
            buckets.total(),
            buckets.low.len(),
            buckets.medium.len(),
            buckets.high.len()
        );
        match stats.last_signal_time {
            Some(ts) => info!("   └─ Last signal: {}", pumpwatch::pipeline::format::clock(ts, offset)),
            None => info!("   └─ Last signal: none"),
        }

        for line in handle.latest_signal_lines(LATEST_SIGNALS_LIMIT, offset) {
            info!("      {}", line);
        }
    }
}
