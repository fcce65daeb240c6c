//! Tick loop driving the scanner engine
//!
//! A fixed one-second tick. Each tick compares elapsed time against the
//! scan and stability cadences and asks the engine to run what is due;
//! follow-ups carry their own per-tracker cadence inside the engine.
//!
//! A failed tick is logged and followed by a fixed backoff. The loop only
//! ends on shutdown, which is checked between ticks: a tick in progress
//! always runs to completion.

use super::engine::ScannerEngine;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration, Instant, MissedTickBehavior};

/// Base tick of the loop
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Pause after a failed tick
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Elapsed-time gate for one periodic pass
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    last_run: Option<Instant>,
}

impl Cadence {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
        }
    }

    /// Due on the first tick, then once `interval` has elapsed since the last run
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_run {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_run = Some(now);
    }
}

/// Run the scanner until `shutdown` flips to true
///
/// # Arguments
/// * `engine` - engine to drive (returned when the loop ends)
/// * `scan_interval` - cadence of the main scan; the stability scan reuses it
/// * `shutdown` - cooperative cancellation signal
pub async fn run_scheduler(
    mut engine: ScannerEngine,
    scan_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> ScannerEngine {
    log::info!("⏰ Starting scan scheduler (tick: {:?}, scan: {:?})", TICK_INTERVAL, scan_interval);

    let mut scan = Cadence::new(scan_interval);
    let mut stability = Cadence::new(scan_interval);

    let mut timer = interval(TICK_INTERVAL);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = timer.tick() => {}
            changed = shutdown.changed() => {
                // Sender dropped counts as shutdown
                if changed.is_err() {
                    break;
                }
                continue;
            }
        }

        let now = Instant::now();
        let scan_due = scan.is_due(now);
        let stability_due = stability.is_due(now);

        match engine.tick(scan_due, stability_due).await {
            Ok(_) => {
                if scan_due {
                    scan.mark(now);
                }
                if stability_due {
                    stability.mark(now);
                }
            }
            Err(e) => {
                log::error!("❌ Tick failed: {}", e);
                log::info!("   └─ Backing off for {:?}", ERROR_BACKOFF);
                tokio::select! {
                    _ = sleep(ERROR_BACKOFF) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }

    log::info!("🛑 Scan scheduler stopped");
    engine
}
