//! Scanner Engine - pass orchestration and the read-only view
//!
//! `ScannerEngine` is the single writer of the [`TrackingTable`]. One call
//! to [`tick`](ScannerEngine::tick) runs, in order:
//!
//! ```text
//! snapshot (only when a scan or stability pass is due)
//!     ↓
//! PumpDetector       (scan due)
//!     ↓
//! EscalationEngine   (every tick, per-tracker cadence)
//!     ↓
//! StabilityDetector  (stability due)
//!     ↓
//! cleanup            (every tick)
//!     ↓
//! publish → ScannerHandle
//! ```
//!
//! ## Read-only view
//!
//! After each tick the engine publishes copies of the tracker table, the
//! aggregate stats and the bucketed snapshot into a [`ScannerHandle`].
//! Handles are cheap to clone and never see a half-updated table.

use super::config::ScannerConfig;
use super::detector::PumpDetector;
use super::error::ScanError;
use super::escalation::{EscalationEngine, EscalationSummary};
use super::format;
use super::market::MarketDataSource;
use super::notifier::SignalSink;
use super::stability::StabilityDetector;
use super::stats::{self, VolumeBuckets};
use super::tracking::{TrackedCoin, TrackingStats, TrackingTable};
use super::types::TickerSnapshot;
use chrono::FixedOffset;
use std::sync::{Arc, PoisonError, RwLock};

/// Default size of the latest-signals listing
pub const LATEST_SIGNALS_LIMIT: usize = 10;

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Tickers in the snapshot, if one was fetched this tick
    pub snapshot_size: Option<usize>,
    pub new_signals: usize,
    pub escalation: EscalationSummary,
    pub stability_alerts: usize,
    pub evicted: Vec<String>,
}

impl TickReport {
    fn is_quiet(&self) -> bool {
        self.new_signals == 0
            && self.escalation.escalated == 0
            && self.escalation.dropped == 0
            && self.stability_alerts == 0
            && self.evicted.is_empty()
    }
}

#[derive(Debug, Default)]
struct PublishedView {
    coins: Vec<TrackedCoin>,
    stats: TrackingStats,
    buckets: VolumeBuckets,
    updated_at: Option<i64>,
}

/// Read-only, cloneable view of the scanner state
#[derive(Clone, Default)]
pub struct ScannerHandle {
    view: Arc<RwLock<PublishedView>>,
}

impl ScannerHandle {
    fn read<T>(&self, f: impl FnOnce(&PublishedView) -> T) -> T {
        let guard = self.view.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn publish(&self, view: PublishedView) {
        let mut guard = self.view.write().unwrap_or_else(PoisonError::into_inner);
        *guard = view;
    }

    /// Copy of every tracker (active and inert), sorted by symbol
    pub fn tracked_coins(&self) -> Vec<TrackedCoin> {
        self.read(|v| v.coins.clone())
    }

    pub fn stats(&self) -> TrackingStats {
        self.read(|v| v.stats.clone())
    }

    /// Latest raw snapshot split by volume, independent of tracking state
    pub fn volume_buckets(&self) -> VolumeBuckets {
        self.read(|v| v.buckets.clone())
    }

    /// Unix seconds of the last publish
    pub fn updated_at(&self) -> Option<i64> {
        self.read(|v| v.updated_at)
    }

    /// Most recently signalled trackers, newest first
    pub fn latest_signals(&self, limit: usize) -> Vec<TrackedCoin> {
        let mut coins = self.tracked_coins();
        coins.sort_by(|a, b| {
            b.last_signal_time
                .cmp(&a.last_signal_time)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        coins.truncate(limit);
        coins
    }

    /// [`latest_signals`](Self::latest_signals) rendered one line each
    pub fn latest_signal_lines(&self, limit: usize, offset: FixedOffset) -> Vec<String> {
        self.latest_signals(limit)
            .iter()
            .map(|coin| format::latest_signal_line(coin, offset))
            .collect()
    }
}

/// Scanner engine owning all mutable detection state
pub struct ScannerEngine {
    table: TrackingTable,
    market: Arc<dyn MarketDataSource>,
    sink: SignalSink,
    pump: PumpDetector,
    escalation: EscalationEngine,
    stability: StabilityDetector,

    /// Latest all-tickers snapshot
    snapshot: Vec<TickerSnapshot>,

    handle: ScannerHandle,

    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl ScannerEngine {
    /// Create an engine using wall-clock time
    pub fn new(config: &ScannerConfig, market: Arc<dyn MarketDataSource>, sink: SignalSink) -> Self {
        Self::new_with_timestamp_fn(
            config,
            market,
            sink,
            Box::new(|| chrono::Utc::now().timestamp()),
        )
    }

    /// Create an engine with a custom timestamp function
    ///
    /// # Arguments
    /// * `now_fn` - Function returning Unix timestamp (for testing)
    pub fn new_with_timestamp_fn(
        config: &ScannerConfig,
        market: Arc<dyn MarketDataSource>,
        sink: SignalSink,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Self {
        Self {
            table: TrackingTable::new(),
            market,
            sink,
            pump: PumpDetector::from_config(config),
            escalation: EscalationEngine::from_config(config),
            stability: StabilityDetector::from_config(config),
            snapshot: Vec::new(),
            handle: ScannerHandle::default(),
            now_fn,
        }
    }

    pub fn handle(&self) -> ScannerHandle {
        self.handle.clone()
    }

    pub fn table(&self) -> &TrackingTable {
        &self.table
    }

    pub fn snapshot(&self) -> &[TickerSnapshot] {
        &self.snapshot
    }

    pub fn now(&self) -> i64 {
        (self.now_fn)()
    }

    /// Replace the stored snapshot with a fresh all-tickers fetch
    ///
    /// On error the previous snapshot is kept.
    pub async fn fetch_snapshot(&mut self) -> Result<usize, ScanError> {
        let snapshot = self.market.get_all_tickers().await?;
        log::debug!("📥 Snapshot: {} tickers", snapshot.len());
        self.snapshot = snapshot;
        Ok(self.snapshot.len())
    }

    /// First-signal pass over the stored snapshot
    pub async fn run_main_scan(&mut self, now: i64) -> usize {
        self.pump
            .run(&self.snapshot, &mut self.table, self.market.as_ref(), &self.sink, now)
            .await
    }

    /// Follow-up checks on every due tracker
    pub async fn run_followups(&mut self, now: i64) -> EscalationSummary {
        self.escalation
            .run(&mut self.table, self.market.as_ref(), &self.sink, now)
            .await
    }

    /// Stability pass over the stored snapshot
    pub async fn run_stability_scan(&mut self, now: i64) -> usize {
        self.stability
            .run(&self.snapshot, self.market.as_ref(), &self.sink, now)
            .await
    }

    /// Evict trackers silent for more than 24h
    pub fn cleanup(&mut self, now: i64) -> Vec<String> {
        let evicted = self.table.sweep_expired(now);
        for symbol in &evicted {
            log::info!("🧹 {} evicted after 24h without a signal", symbol);
        }
        self.stability.prune(now);
        evicted
    }

    /// Copy the current state into the read-only handle
    pub fn publish(&self, now: i64) {
        let table = &self.table;
        self.handle.publish(PublishedView {
            coins: table.snapshot(),
            stats: table.stats(),
            buckets: stats::bucket_snapshot(&self.snapshot, |symbol| table.signal_count_of(symbol)),
            updated_at: Some(now),
        });
    }

    /// Run one scheduler tick
    ///
    /// A snapshot is fetched only when a scan or stability pass is due. A
    /// failed fetch skips both snapshot passes; follow-ups, cleanup and
    /// publish still run, then the fetch error is returned to the caller.
    ///
    /// # Arguments
    /// * `scan_due` - run the first-signal pass
    /// * `stability_due` - run the stability pass
    pub async fn tick(&mut self, scan_due: bool, stability_due: bool) -> Result<TickReport, ScanError> {
        let now = self.now();
        let mut report = TickReport::default();
        let mut fetch_error = None;

        if scan_due || stability_due {
            match self.fetch_snapshot().await {
                Ok(size) => report.snapshot_size = Some(size),
                Err(e) => {
                    log::warn!("⚠️  Snapshot fetch failed, skipping scan passes: {}", e);
                    fetch_error = Some(e);
                }
            }
        }
        let snapshot_ok = fetch_error.is_none();

        if scan_due && snapshot_ok {
            report.new_signals = self.run_main_scan(now).await;
        }

        report.escalation = self.run_followups(now).await;

        if stability_due && snapshot_ok {
            report.stability_alerts = self.run_stability_scan(now).await;
        }

        report.evicted = self.cleanup(now);
        self.publish(now);

        if let Some(e) = fetch_error {
            return Err(e);
        }

        if !report.is_quiet() {
            log::info!(
                "📊 Tick: {} new, {} escalated, {} dropped, {} stability, {} evicted ({} tracked)",
                report.new_signals,
                report.escalation.escalated,
                report.escalation.dropped,
                report.stability_alerts,
                report.evicted.len(),
                self.table.len()
            );
        }

        Ok(report)
    }
}
