//! # Pump Scanning Pipeline
//!
//! One tick loop drives three independently-cadenced passes over the
//! latest market snapshot:
//!
//! ```text
//! tick (1s)
//!   ├─ snapshot (all quote-currency tickers, blacklist applied)
//!   ├─ PumpDetector      → first signal + new tracker
//!   ├─ EscalationEngine  → follow-up checks on due trackers
//!   ├─ StabilityDetector → flat-then-breakout alerts (untracked)
//!   └─ cleanup           → evict trackers silent for > 24h
//! ```
//!
//! ## Ownership
//!
//! The scheduler loop owns the [`TrackingTable`] exclusively. Every other
//! consumer (status log, dashboards) goes through a [`ScannerHandle`],
//! which only ever sees copies published at the end of a pass.
//!
//! ## Module Organization
//!
//! - `types` - snapshots, candles, trades, signal records
//! - `error` - error taxonomy shared by all components
//! - `config` - environment-driven configuration + validation
//! - `blocklist` - quote-currency and symbol-pattern filtering
//! - `thresholds` - re-alert ladder arithmetic
//! - `tracking` - per-symbol tracker table
//! - `stats` - trade-history excerpt, cash estimate, volume buckets
//! - `format` - message rendering (display timezone lives here only)
//! - `market` / `gateio` - market-data trait + Gate.io REST client
//! - `notifier` / `telegram` - delivery trait, observers + Telegram client
//! - `detector` / `escalation` / `stability` - the three passes
//! - `engine` - pass orchestration and the read-only handle
//! - `scheduler` - the tick loop
//! - `db` - SQLite signal log

pub mod types;
pub mod error;
pub mod config;
pub mod blocklist;
pub mod thresholds;
pub mod tracking;
pub mod stats;
pub mod format;
pub mod market;
pub mod gateio;
pub mod notifier;
pub mod telegram;
pub mod detector;
pub mod escalation;
pub mod stability;
pub mod engine;
pub mod scheduler;
pub mod db;

// Re-export commonly used types
pub use types::{Candle, SignalKind, SignalRecord, TickerDetail, TickerSnapshot, Trade, VolumeCategory};
pub use error::ScanError;
pub use config::ScannerConfig;
pub use blocklist::Blocklist;
pub use tracking::{TrackedCoin, TrackingTable};
pub use market::MarketDataSource;
pub use notifier::{Notifier, SignalObserver, SignalSink};
pub use engine::{ScannerEngine, ScannerHandle};
pub use db::SqliteSignalStore;
